//! Table management commands: list, create, delete.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use cardroom_types::game::{CreateGameRequest, GameId, GameStatus, GameSummary};

use crate::state::AppState;

/// Print every table as a styled table or JSON.
pub async fn list_games(state: &AppState, json: bool) -> Result<()> {
    let games = state.game_service.list_games().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&games)?);
        return Ok(());
    }

    if games.is_empty() {
        println!();
        println!(
            "  {} No games yet. Open one with: {}",
            style("i").blue().bold(),
            style("cardroom games create").yellow()
        );
        println!();
        return Ok(());
    }

    println!();
    println!("{}", games_table(&games));
    println!();
    println!(
        "  {} game{}",
        style(games.len()).bold(),
        if games.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

fn games_table(games: &[GameSummary]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Name").fg(Color::White),
        Cell::new("Id").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Seats").fg(Color::White),
        Cell::new("Blinds").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
    ]);

    for game in games {
        let status_cell = match game.status {
            GameStatus::Waiting => Cell::new("○ waiting").fg(Color::Yellow),
            GameStatus::Playing => Cell::new("● playing").fg(Color::Green),
            GameStatus::Finished => Cell::new("◌ finished").fg(Color::DarkGrey),
        };

        table.add_row(vec![
            Cell::new(&game.name).fg(Color::Cyan),
            Cell::new(game.id.as_str()),
            status_cell,
            Cell::new(format!("{}/{}", game.players, game.max_players)),
            Cell::new(format!("{}/{}", game.small_blind, game.big_blind)),
            Cell::new(format_relative_time(&game.updated_at)).fg(Color::DarkGrey),
        ]);
    }

    table
}

pub async fn create_game(
    state: &AppState,
    req: CreateGameRequest,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let game = state.game_service.create_game(req).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&game)?);
    } else if !quiet {
        println!();
        println!(
            "  {} Opened '{}' ({} seats, blinds {}/{})",
            style("✓").green().bold(),
            style(&game.name).cyan(),
            game.max_players,
            game.small_blind,
            game.big_blind
        );
        println!("  {}", style(format!("id: {}", game.id)).dim());
        println!();
    }

    Ok(())
}

pub async fn delete_game(state: &AppState, id: &str, json: bool, quiet: bool) -> Result<()> {
    state.game_service.delete_game(&GameId::from(id)).await?;

    if json {
        println!("{}", serde_json::json!({"deleted": true, "id": id}));
    } else if !quiet {
        println!();
        println!("  {} Deleted game {}", style("✓").green().bold(), style(id).cyan());
        println!();
    }

    Ok(())
}

fn format_relative_time(dt: &chrono::DateTime<chrono::Utc>) -> String {
    let diff = chrono::Utc::now() - *dt;

    if diff.num_minutes() < 1 {
        "just now".to_string()
    } else if diff.num_hours() < 1 {
        format!("{}m ago", diff.num_minutes())
    } else if diff.num_days() < 1 {
        format!("{}h ago", diff.num_hours())
    } else if diff.num_days() < 30 {
        format!("{}d ago", diff.num_days())
    } else {
        dt.format("%Y-%m-%d").to_string()
    }
}
