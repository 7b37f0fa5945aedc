//! `SQLite` implementation of [`ProgramStore`].
//!
//! Both tables are rewritten as a whole inside a single transaction, so a
//! failed write leaves the previous contents in place.

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use brewery_app::ports::ProgramStore;
use brewery_domain::error::BreweryError;
use brewery_domain::id::SensorId;
use brewery_domain::program::ProgramRecord;
use brewery_domain::sensor::Sensor;

use crate::error::StorageError;

/// Wrapper for converting database rows into [`ProgramRecord`].
struct RecordRow(ProgramRecord);

impl<'r> FromRow<'r, SqliteRow> for RecordRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(ProgramRecord {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            sensor_id: row.try_get("sensor_id")?,
            heating_relay_index: row.try_get("heating_relay_index")?,
            cooling_relay_index: row.try_get("cooling_relay_index")?,
            min_temp: row.try_get("min_temp")?,
            max_temp: row.try_get("max_temp")?,
            active: row.try_get("active")?,
        }))
    }
}

/// Wrapper for converting database rows into [`Sensor`].
struct SensorRow(Sensor);

impl<'r> FromRow<'r, SqliteRow> for SensorRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        Ok(Self(Sensor::new(SensorId::new(id), name)))
    }
}

const SELECT_PROGRAMS: &str = "SELECT * FROM programs ORDER BY position";
const DELETE_PROGRAMS: &str = "DELETE FROM programs";
const INSERT_PROGRAM: &str = "INSERT INTO programs (position, id, name, sensor_id, heating_relay_index, cooling_relay_index, min_temp, max_temp, active) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)";
const SELECT_SENSORS: &str = "SELECT * FROM sensors ORDER BY id";
const DELETE_SENSORS: &str = "DELETE FROM sensors";
const INSERT_SENSOR: &str = "INSERT INTO sensors (id, name) VALUES (?, ?)";

/// `SQLite`-backed program and sensor catalogue store.
pub struct SqliteProgramStore {
    pool: SqlitePool,
}

impl SqliteProgramStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

async fn replace_programs(
    pool: &SqlitePool,
    programs: &[ProgramRecord],
) -> Result<(), StorageError> {
    let mut tx = pool.begin().await?;
    sqlx::query(DELETE_PROGRAMS).execute(&mut *tx).await?;
    for (position, record) in (0_i64..).zip(programs) {
        sqlx::query(INSERT_PROGRAM)
            .bind(position)
            .bind(record.id.as_deref())
            .bind(&record.name)
            .bind(&record.sensor_id)
            .bind(record.heating_relay_index)
            .bind(record.cooling_relay_index)
            .bind(record.min_temp)
            .bind(record.max_temp)
            .bind(record.active)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

async fn replace_sensors(pool: &SqlitePool, sensors: &[Sensor]) -> Result<(), StorageError> {
    let mut tx = pool.begin().await?;
    sqlx::query(DELETE_SENSORS).execute(&mut *tx).await?;
    for sensor in sensors {
        sqlx::query(INSERT_SENSOR)
            .bind(sensor.id.as_str())
            .bind(&sensor.name)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

impl ProgramStore for SqliteProgramStore {
    fn load_programs(
        &self,
    ) -> impl Future<Output = Result<Vec<ProgramRecord>, BreweryError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<RecordRow> = sqlx::query_as(SELECT_PROGRAMS)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|row| row.0).collect())
        }
    }

    fn store_programs(
        &self,
        programs: Vec<ProgramRecord>,
    ) -> impl Future<Output = Result<(), BreweryError>> + Send {
        let pool = self.pool.clone();
        async move {
            replace_programs(&pool, &programs).await?;
            tracing::debug!(count = programs.len(), "programs stored");
            Ok(())
        }
    }

    fn load_sensor_names(&self) -> impl Future<Output = Result<Vec<Sensor>, BreweryError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<SensorRow> = sqlx::query_as(SELECT_SENSORS)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|row| row.0).collect())
        }
    }

    fn store_sensor_names(
        &self,
        sensors: Vec<Sensor>,
    ) -> impl Future<Output = Result<(), BreweryError>> + Send {
        let pool = self.pool.clone();
        async move {
            replace_sensors(&pool, &sensors).await?;
            tracing::debug!(count = sensors.len(), "sensor names stored");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;
    use brewery_domain::program::{Program, UNASSIGNED};

    async fn setup() -> SqliteProgramStore {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqliteProgramStore::new(db.pool().clone())
    }

    fn record(sensor: &str, heating: usize) -> ProgramRecord {
        let program = Program::builder()
            .name(format!("zone {sensor}"))
            .sensor_id(sensor)
            .heating_relay(heating)
            .range(18.0, 18.6)
            .build();
        ProgramRecord::from(program)
    }

    #[tokio::test]
    async fn should_return_empty_lists_when_nothing_stored() {
        let store = setup().await;
        assert!(store.load_programs().await.unwrap().is_empty());
        assert!(store.load_sensor_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_load_programs_in_stored_order() {
        let store = setup().await;
        let records = vec![record("s3", 0), record("s1", 1), record("s2", 2)];

        store.store_programs(records.clone()).await.unwrap();

        assert_eq!(store.load_programs().await.unwrap(), records);
    }

    #[tokio::test]
    async fn should_replace_whole_program_list_when_storing() {
        let store = setup().await;
        store
            .store_programs(vec![record("s1", 0), record("s2", 1)])
            .await
            .unwrap();

        let survivor = record("s3", 2);
        store.store_programs(vec![survivor.clone()]).await.unwrap();

        assert_eq!(store.load_programs().await.unwrap(), vec![survivor]);
    }

    #[tokio::test]
    async fn should_keep_unassigned_relays_and_missing_id() {
        let store = setup().await;
        let mut anonymous = record("s1", 0);
        anonymous.id = None;
        anonymous.heating_relay_index = UNASSIGNED;

        store.store_programs(vec![anonymous]).await.unwrap();

        let loaded = store.load_programs().await.unwrap();
        assert_eq!(loaded[0].id, None);
        assert_eq!(loaded[0].heating_relay_index, UNASSIGNED);
        assert_eq!(loaded[0].cooling_relay_index, UNASSIGNED);
        assert!(loaded[0].active);
    }

    #[tokio::test]
    async fn should_store_and_load_sensor_names() {
        let store = setup().await;
        let sensors = vec![Sensor::new("28-a", "kettle"), Sensor::new("28-b", "")];

        store.store_sensor_names(sensors.clone()).await.unwrap();

        assert_eq!(store.load_sensor_names().await.unwrap(), sensors);
    }

    #[tokio::test]
    async fn should_keep_previous_sensor_names_when_write_fails() {
        let store = setup().await;
        let previous = vec![Sensor::new("28-a", "kettle")];
        store.store_sensor_names(previous.clone()).await.unwrap();

        // duplicate primary key aborts the transaction half way
        let result = store
            .store_sensor_names(vec![Sensor::new("28-b", "x"), Sensor::new("28-b", "y")])
            .await;

        assert!(matches!(result, Err(BreweryError::Storage(_))));
        assert_eq!(store.load_sensor_names().await.unwrap(), previous);
    }
}
