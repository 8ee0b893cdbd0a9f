use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime},
    models::Observation,
};

fn row_to_observation(row: &Row) -> Result<Observation> {
    let green_start: String = row.get("green_start")?;
    let green_end: String = row.get("green_end")?;
    let created_at: String = row.get("created_at")?;

    Ok(Observation {
        id: row.get("id")?,
        traffic_light_id: row.get("traffic_light_id")?,
        green_start: parse_datetime(&green_start, "green_start")?,
        green_end: parse_datetime(&green_end, "green_end")?,
        duration_ms: row.get("duration_ms")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_observation(&self, observation: &Observation) -> Result<()> {
        let record = observation.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO schedules (id, traffic_light_id, green_start, green_end, duration_ms, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.traffic_light_id,
                    format_datetime(&record.green_start),
                    format_datetime(&record.green_end),
                    record.duration_ms,
                    format_datetime(&record.created_at),
                ],
            )
            .with_context(|| "failed to insert schedule capture")?;
            Ok(())
        })
        .await
    }

    /// Load every capture for a traffic light, ordered by green_start.
    pub async fn list_observations(&self, traffic_light_id: &str) -> Result<Vec<Observation>> {
        let traffic_light_id = traffic_light_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT
                    id,
                    traffic_light_id,
                    green_start,
                    green_end,
                    duration_ms,
                    created_at
                FROM schedules
                WHERE traffic_light_id = ?1
                ORDER BY green_start ASC",
            )?;

            let mut rows = stmt.query(params![traffic_light_id])?;
            let mut observations = Vec::new();
            while let Some(row) = rows.next()? {
                observations.push(row_to_observation(row)?);
            }

            Ok(observations)
        })
        .await
    }

    pub async fn get_observation(&self, observation_id: &str) -> Result<Option<Observation>> {
        let observation_id = observation_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, traffic_light_id, green_start, green_end, duration_ms, created_at
                 FROM schedules
                 WHERE id = ?1",
            )?;

            let mut rows = stmt.query(params![observation_id])?;
            let observation = match rows.next()? {
                Some(row) => Some(row_to_observation(row)?),
                None => None,
            };
            Ok(observation)
        })
        .await
    }

    /// Returns whether a capture was removed.
    pub async fn delete_observation(&self, observation_id: &str) -> Result<bool> {
        let observation_id = observation_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn
                .execute("DELETE FROM schedules WHERE id = ?1", params![observation_id])
                .context("failed to delete schedule capture")?;
            Ok(rows_affected > 0)
        })
        .await
    }
}
