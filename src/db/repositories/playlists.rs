//! Playlists and their ordered membership.
//!
//! Positions are maintained with the shifts from [`crate::db::ordering`].
//! Each add/remove/move runs its shift and placement in one transaction, so
//! a failure halfway never leaves a gap or a duplicate position behind.

use rusqlite::{params, OptionalExtension, Transaction};
use tracing::{debug, info};

use crate::db::connection::DatabaseConnection;
use crate::db::models::{Playlist, PlaylistInfo, PlaylistPatch, PlaylistTrack};
use crate::db::ordering::{clamp_position, insert_shift, move_shift, removal_shift, PlaylistOrder, RangeShift};
use crate::db::repositories::UpdateBuilder;
use crate::error::Result;
use crate::format::format_playlist_duration;

/// Add `?1` to every position of playlist `?2` in `[?3, ?4]`; a NULL end is unbounded.
const SHIFT_SQL: &str = "UPDATE playlist_tracks SET position = position + ?1
    WHERE playlist_id = ?2 AND position >= ?3 AND (?4 IS NULL OR position <= ?4)";

pub(crate) fn apply_shift(
    tx: &Transaction<'_>,
    playlist_id: i64,
    shift: RangeShift,
) -> rusqlite::Result<usize> {
    tx.execute(
        SHIFT_SQL,
        params![shift.delta, playlist_id, shift.start, shift.end],
    )
}

fn position_of(tx: &Transaction<'_>, playlist_id: i64, track_id: i64) -> rusqlite::Result<Option<i64>> {
    tx.query_row(
        "SELECT position FROM playlist_tracks WHERE playlist_id = ?1 AND track_id = ?2",
        params![playlist_id, track_id],
        |row| row.get(0),
    )
    .optional()
}

pub struct PlaylistRepository {
    db: DatabaseConnection,
}

impl PlaylistRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn create(&self, name: &str) -> Result<i64> {
        self.db
            .execute("INSERT INTO playlists (name) VALUES (?1)", params![name])
            .into_new_id("playlist")
    }

    pub fn get(&self, playlist_id: i64) -> Result<Option<Playlist>> {
        self.db.query_optional(
            "SELECT id, name FROM playlists WHERE id = ?1",
            params![playlist_id],
            Playlist::from_row,
        )
    }

    pub fn get_by_name(&self, name: &str) -> Result<Option<Playlist>> {
        self.db.query_optional(
            "SELECT id, name FROM playlists WHERE name = ?1",
            params![name],
            Playlist::from_row,
        )
    }

    pub fn update(&self, playlist_id: i64, patch: &PlaylistPatch) -> Result<usize> {
        let mut update = UpdateBuilder::new();
        update.set("name", patch.name.clone());
        update.execute(&self.db, "playlists", playlist_id)
    }

    /// Membership rows go with the playlist.
    pub fn delete(&self, playlist_id: i64) -> Result<usize> {
        self.db
            .execute("DELETE FROM playlists WHERE id = ?1", params![playlist_id])
            .into_affected()
    }

    pub fn get_all(&self) -> Result<Vec<Playlist>> {
        self.db
            .query("SELECT id, name FROM playlists ORDER BY name", [], Playlist::from_row)
    }

    /// Put `track_id` at position 1, pushing every member down by one.
    ///
    /// Returns 0 when the track is already in the playlist.
    pub fn add_track(&self, playlist_id: i64, track_id: i64) -> Result<usize> {
        let added = self.db.transaction(|tx| {
            if position_of(tx, playlist_id, track_id)?.is_some() {
                return Ok(0);
            }
            apply_shift(tx, playlist_id, insert_shift())?;
            Ok(tx.execute(
                "INSERT INTO playlist_tracks (playlist_id, track_id, position) VALUES (?1, ?2, 1)",
                params![playlist_id, track_id],
            )?)
        })?;
        debug!(playlist_id, track_id, added, "add track to playlist");
        Ok(added)
    }

    /// Remove `track_id` and close the gap. Returns 0 when it was not a member.
    pub fn remove_track(&self, playlist_id: i64, track_id: i64) -> Result<usize> {
        let removed = self.db.transaction(|tx| {
            let Some(position) = position_of(tx, playlist_id, track_id)? else {
                return Ok(0);
            };
            let removed = tx.execute(
                "DELETE FROM playlist_tracks WHERE playlist_id = ?1 AND track_id = ?2",
                params![playlist_id, track_id],
            )?;
            apply_shift(tx, playlist_id, removal_shift(position))?;
            Ok(removed)
        })?;
        debug!(playlist_id, track_id, removed, "remove track from playlist");
        Ok(removed)
    }

    /// Move `track_id` to `new_position`, clamped into `1..=N`.
    ///
    /// Returns 0 when the track is not a member or is already there.
    pub fn move_track(&self, playlist_id: i64, track_id: i64, new_position: i64) -> Result<usize> {
        let moved = self.db.transaction(|tx| {
            let Some(current) = position_of(tx, playlist_id, track_id)? else {
                return Ok(0);
            };
            let len: i64 = tx.query_row(
                "SELECT COUNT(*) FROM playlist_tracks WHERE playlist_id = ?1",
                params![playlist_id],
                |row| row.get(0),
            )?;
            let target = clamp_position(new_position, len);
            let Some(shift) = move_shift(current, target) else {
                return Ok(0);
            };
            apply_shift(tx, playlist_id, shift)?;
            Ok(tx.execute(
                "UPDATE playlist_tracks SET position = ?1 WHERE playlist_id = ?2 AND track_id = ?3",
                params![target, playlist_id, track_id],
            )?)
        })?;
        if moved > 0 {
            info!(playlist_id, track_id, new_position, "moved playlist track");
        }
        Ok(moved)
    }

    /// Members joined with track and artist data, by ascending position.
    pub fn get_tracks(&self, playlist_id: i64) -> Result<Vec<PlaylistTrack>> {
        self.db.query(
            "SELECT pt.track_id, pt.position, t.title, t.duration, a.name AS artist_name
             FROM playlist_tracks pt
             JOIN tracks t ON t.id = pt.track_id
             LEFT JOIN artists a ON a.id = t.artist_id
             WHERE pt.playlist_id = ?1
             ORDER BY pt.position",
            params![playlist_id],
            |row| {
                Ok(PlaylistTrack {
                    track_id: row.get("track_id")?,
                    title: row.get("title")?,
                    duration: row.get("duration")?,
                    artist_name: row.get("artist_name")?,
                    position: row.get("position")?,
                })
            },
        )
    }

    /// The stored `(track_id, position)` pairs as an in-memory order.
    pub fn get_order(&self, playlist_id: i64) -> Result<PlaylistOrder> {
        let members: Vec<(i64, i64)> = self.db.query(
            "SELECT track_id, position FROM playlist_tracks WHERE playlist_id = ?1",
            params![playlist_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(PlaylistOrder::from_members(members))
    }

    pub fn track_count(&self, playlist_id: i64) -> Result<i64> {
        let count = self.db.query_optional(
            "SELECT COUNT(*) FROM playlist_tracks WHERE playlist_id = ?1",
            params![playlist_id],
            |row| row.get(0),
        )?;
        Ok(count.unwrap_or(0))
    }

    /// Track count and `HH:MM:SS` total, or `None` for an unknown playlist.
    pub fn get_info(&self, playlist_id: i64) -> Result<Option<PlaylistInfo>> {
        self.db.query_optional(
            "SELECT p.id, p.name,
                    COUNT(pt.track_id) AS track_count,
                    COALESCE(SUM(t.duration), 0) AS total_seconds
             FROM playlists p
             LEFT JOIN playlist_tracks pt ON pt.playlist_id = p.id
             LEFT JOIN tracks t ON t.id = pt.track_id
             WHERE p.id = ?1
             GROUP BY p.id",
            params![playlist_id],
            |row| {
                let total: i64 = row.get("total_seconds")?;
                Ok(PlaylistInfo {
                    id: row.get("id")?,
                    name: row.get("name")?,
                    track_count: row.get("track_count")?,
                    total_duration: format_playlist_duration(total),
                })
            },
        )
    }
}
