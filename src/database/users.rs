use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::{Stats, User};

pub fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, display_name, role, fcm_token, tournaments_joined, tournaments_won, total_earnings) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.id,
            user.display_name,
            user.role,
            user.fcm_token,
            user.stats.tournaments_joined,
            user.stats.tournaments_won,
            user.stats.total_earnings,
        ],
    )
    .context("Failed to insert user")
    .map(|_| ())
}

fn parse_user_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        display_name: row.get(1)?,
        role: row.get(2)?,
        fcm_token: row.get(3)?,
        stats: Stats {
            tournaments_joined: row.get(4)?,
            tournaments_won: row.get(5)?,
            total_earnings: row.get(6)?,
        },
    })
}

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    let sql = "SELECT id, display_name, role, fcm_token, tournaments_joined, tournaments_won, total_earnings FROM users WHERE id = ?1";

    conn.query_row(sql, params![id], parse_user_row)
        .optional()
        .context("Failed to query user by id")
}

/// Adds to a user's win count and earnings. Returns `false` for unknown users.
pub fn credit(conn: &Connection, id: &str, wins: i64, earnings: i64) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE users SET tournaments_won = tournaments_won + ?1, total_earnings = total_earnings + ?2 WHERE id = ?3",
            params![wins, earnings, id],
        )
        .context("Failed to credit user stats")?;

    Ok(changed == 1)
}
