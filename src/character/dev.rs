//! Character domain: debug-only state logging.

use bevy::prelude::*;

use crate::modes::ModeRegistry;

use super::controller::PlayerCharacter;

/// Log a per-character state line, mirroring the in-game debug readout.
pub(crate) fn log_character_state(query: Query<(&PlayerCharacter, &ModeRegistry)>) {
    for (character, modes) in &query {
        let state = character.state();
        debug!(
            "stance={:?} grounded={} speed={:.1} jumps={} mode={:?} slam={}",
            state.stance,
            state.grounded,
            state.velocity.length(),
            character.remaining_jumps(),
            modes.active(),
            modes.is_slamming(),
        );
    }
}
