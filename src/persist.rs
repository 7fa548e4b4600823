//! The only path by which a draw reaches storage.

use tracing::info;

use crate::error::{CrawlError, Result};
use crate::normalize;
use crate::store::DrawStore;
use crate::types::{DrawResult, StoredDraw};

/// Validates, checks for an existing period and inserts. The existence check
/// immediately precedes the insert; callers serialize per game.
pub fn save_draw_result(store: &dyn DrawStore, draw: DrawResult) -> Result<StoredDraw> {
    normalize::validate(&draw)?;

    let game_id = store
        .game_id(draw.game)?
        .ok_or(CrawlError::UnknownGame(draw.game))?;

    if store.period_exists(game_id, &draw.period)? {
        return Err(CrawlError::DuplicatePeriod {
            game: draw.game,
            period: draw.period,
        });
    }

    let id = store.insert(game_id, &draw)?;
    info!(
        game = %draw.game,
        period = %draw.period,
        primary = ?draw.primary_balls,
        secondary = ?draw.secondary_balls,
        id,
        "draw saved"
    );
    Ok(StoredDraw { id, game_id, draw })
}
