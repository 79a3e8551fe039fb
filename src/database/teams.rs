use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::{Stats, Team};

pub fn insert_team(conn: &Connection, team: &Team) -> Result<()> {
    conn.execute(
        "INSERT INTO teams (id, name, tournaments_joined, tournaments_won, total_earnings) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            team.id,
            team.name,
            team.stats.tournaments_joined,
            team.stats.tournaments_won,
            team.stats.total_earnings,
        ],
    )
    .context("Failed to insert team")?;

    for member_id in &team.member_ids {
        conn.execute(
            "INSERT INTO team_members (team_id, user_id) VALUES (?1, ?2)",
            params![team.id, member_id],
        )
        .context("Failed to insert team member")?;
    }
    Ok(())
}

fn list_member_ids(conn: &Connection, team_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT user_id FROM team_members WHERE team_id = ?1 ORDER BY user_id")?;
    let rows = stmt
        .query_map(params![team_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;

    Ok(rows)
}

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<Team>> {
    let sql = "SELECT id, name, tournaments_joined, tournaments_won, total_earnings FROM teams WHERE id = ?1";

    let team = conn
        .query_row(sql, params![id], |row| {
            Ok(Team {
                id: row.get(0)?,
                name: row.get(1)?,
                member_ids: Vec::new(),
                stats: Stats {
                    tournaments_joined: row.get(2)?,
                    tournaments_won: row.get(3)?,
                    total_earnings: row.get(4)?,
                },
            })
        })
        .optional()
        .context("Failed to query team by id")?;

    match team {
        Some(mut t) => {
            t.member_ids = list_member_ids(conn, &t.id)?;
            Ok(Some(t))
        }
        None => Ok(None),
    }
}

pub fn credit(conn: &Connection, id: &str, wins: i64, earnings: i64) -> Result<bool> {
    let changed = conn
        .execute(
            "UPDATE teams SET tournaments_won = tournaments_won + ?1, total_earnings = total_earnings + ?2 WHERE id = ?3",
            params![wins, earnings, id],
        )
        .context("Failed to credit team stats")?;

    Ok(changed == 1)
}
