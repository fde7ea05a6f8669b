use anyhow::Result;
use rishta_types::models::AppSettings;
use rusqlite::Connection;

use crate::Database;

fn query_settings(conn: &Connection) -> Result<AppSettings> {
    Ok(conn.query_row(
        "SELECT boost_price_cents, boost_duration_days, currency, max_message_length,
                maintenance_mode, support_email
         FROM app_settings WHERE id = 1",
        [],
        |row| {
            Ok(AppSettings {
                boost_price_cents: row.get(0)?,
                boost_duration_days: row.get(1)?,
                currency: row.get(2)?,
                max_message_length: row.get(3)?,
                maintenance_mode: row.get(4)?,
                support_email: row.get(5)?,
            })
        },
    )?)
}

impl Database {
    pub fn get_settings(&self) -> Result<AppSettings> {
        self.with_conn(query_settings)
    }

    pub fn save_settings(&self, settings: &AppSettings) -> Result<AppSettings> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE app_settings SET boost_price_cents = ?1, boost_duration_days = ?2, currency = ?3,
                        max_message_length = ?4, maintenance_mode = ?5, support_email = ?6
                 WHERE id = 1",
                rusqlite::params![
                    settings.boost_price_cents,
                    settings.boost_duration_days,
                    settings.currency,
                    settings.max_message_length,
                    settings.maintenance_mode,
                    settings.support_email,
                ],
            )?;
            query_settings(conn)
        })
    }
}

#[cfg(test)]
mod tests {
    use rishta_types::models::AppSettings;

    use crate::queries::fixtures;

    #[test]
    fn settings_are_seeded_and_saved() {
        let db = fixtures::db();
        assert_eq!(db.get_settings().unwrap(), AppSettings::default());

        let mut settings = db.get_settings().unwrap();
        settings.maintenance_mode = true;
        settings.boost_price_cents = 99_900;
        let saved = db.save_settings(&settings).unwrap();
        assert_eq!(saved, settings);
        assert_eq!(db.get_settings().unwrap(), settings);
    }
}
