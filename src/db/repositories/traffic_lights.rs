use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime},
    models::{TrafficLight, TrafficLightInput, TrafficLightUpdate},
};

const SELECT_COLUMNS: &str =
    "SELECT id, location, latitude, longitude, notes, last_updated, created_at FROM traffic_lights";

fn row_to_traffic_light(row: &Row) -> Result<TrafficLight> {
    let last_updated: String = row.get("last_updated")?;
    let created_at: String = row.get("created_at")?;

    Ok(TrafficLight {
        id: row.get("id")?,
        location: row.get("location")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        notes: row.get("notes")?,
        last_updated: parse_datetime(&last_updated, "last_updated")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

fn fetch_traffic_light(conn: &Connection, traffic_light_id: &str) -> Result<Option<TrafficLight>> {
    let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
    let mut rows = stmt.query(params![traffic_light_id])?;
    let light = match rows.next()? {
        Some(row) => Some(row_to_traffic_light(row)?),
        None => None,
    };
    Ok(light)
}

impl Database {
    pub async fn create_traffic_light(&self, input: TrafficLightInput) -> Result<TrafficLight> {
        self.execute(move |conn| {
            let now = Utc::now();
            let id = Uuid::new_v4().to_string();

            conn.execute(
                "INSERT INTO traffic_lights (id, location, latitude, longitude, notes, last_updated, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    input.location,
                    input.latitude,
                    input.longitude,
                    input.notes,
                    format_datetime(&now),
                    format_datetime(&now),
                ],
            )
            .context("failed to insert traffic light")?;

            fetch_traffic_light(conn, &id)?
                .ok_or_else(|| anyhow!("Traffic light not found after insert"))
        })
        .await
    }

    /// All traffic lights, newest first.
    pub async fn list_traffic_lights(&self) -> Result<Vec<TrafficLight>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC"))?;

            let mut rows = stmt.query([])?;
            let mut lights = Vec::new();
            while let Some(row) = rows.next()? {
                lights.push(row_to_traffic_light(row)?);
            }

            Ok(lights)
        })
        .await
    }

    pub async fn get_traffic_light(&self, traffic_light_id: &str) -> Result<Option<TrafficLight>> {
        let traffic_light_id = traffic_light_id.to_string();
        self.execute(move |conn| fetch_traffic_light(conn, &traffic_light_id))
            .await
    }

    pub async fn traffic_light_exists(&self, traffic_light_id: &str) -> Result<bool> {
        let traffic_light_id = traffic_light_id.to_string();
        self.execute(move |conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM traffic_lights WHERE id = ?1",
                    params![traffic_light_id],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    /// Update the provided fields and refresh `last_updated`.
    /// Returns `None` if the traffic light does not exist. An empty update
    /// returns the record unchanged.
    pub async fn update_traffic_light(
        &self,
        traffic_light_id: &str,
        update: TrafficLightUpdate,
    ) -> Result<Option<TrafficLight>> {
        let traffic_light_id = traffic_light_id.to_string();
        self.execute(move |conn| {
            if update.is_empty() {
                return fetch_traffic_light(conn, &traffic_light_id);
            }

            // Build update query dynamically based on what's being updated
            let mut updates = Vec::new();
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(location) = update.location {
                updates.push("location = ?");
                params_vec.push(Box::new(location));
            }
            if let Some(latitude) = update.latitude {
                updates.push("latitude = ?");
                params_vec.push(Box::new(latitude));
            }
            if let Some(longitude) = update.longitude {
                updates.push("longitude = ?");
                params_vec.push(Box::new(longitude));
            }
            if let Some(notes) = update.notes {
                updates.push("notes = ?");
                params_vec.push(Box::new(notes));
            }

            updates.push("last_updated = ?");
            params_vec.push(Box::new(format_datetime(&Utc::now())));

            let query = format!(
                "UPDATE traffic_lights SET {} WHERE id = ?",
                updates.join(", ")
            );
            params_vec.push(Box::new(traffic_light_id.clone()));

            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|b| b.as_ref()).collect();

            let rows_affected = conn
                .execute(&query, params_refs.as_slice())
                .context("failed to update traffic light")?;
            if rows_affected == 0 {
                return Ok(None);
            }

            fetch_traffic_light(conn, &traffic_light_id)
        })
        .await
    }

    /// Delete a traffic light and, through the foreign key cascade, its captures.
    /// Returns whether a row was removed.
    pub async fn delete_traffic_light(&self, traffic_light_id: &str) -> Result<bool> {
        let traffic_light_id = traffic_light_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn
                .execute(
                    "DELETE FROM traffic_lights WHERE id = ?1",
                    params![traffic_light_id],
                )
                .context("failed to delete traffic light")?;
            Ok(rows_affected > 0)
        })
        .await
    }

    /// Delete every traffic light. Returns the number removed.
    pub async fn delete_all_traffic_lights(&self) -> Result<usize> {
        self.execute(|conn| {
            let rows_affected = conn
                .execute("DELETE FROM traffic_lights", [])
                .context("failed to delete traffic lights")?;
            Ok(rows_affected)
        })
        .await
    }
}
