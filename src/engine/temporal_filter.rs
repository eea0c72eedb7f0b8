use crate::config::{ThreatEntity, TimeWindow};
use crate::error::{Result, ThreatMapError};

/// Earliest timestamp still visible under `window`. `None` means unbounded.
pub fn cutoff_millis(window: TimeWindow, now_millis: i64) -> Option<i64> {
    window
        .duration_millis()
        .map(|d| now_millis.saturating_sub(d))
}

/// Whether `entity` falls inside `window` as of `now_millis`.
///
/// Entities stamped after `now_millis` (clock skew between source and host)
/// count as visible. An entity without a timestamp is rejected for every
/// window, including `All`.
pub fn is_visible(entity: &ThreatEntity, window: TimeWindow, now_millis: i64) -> Result<bool> {
    let ts = entity.timestamp_millis.ok_or_else(|| ThreatMapError::InvalidEntity {
        id: entity.id,
        reason: "missing or unparseable timestamp".to_string(),
    })?;

    Ok(match cutoff_millis(window, now_millis) {
        None => true,
        Some(cutoff) => ts >= cutoff,
    })
}

/// Entities visible under `window`, in input order. Invalid entities are
/// skipped and counted.
pub fn visible_entities(
    entities: &[ThreatEntity],
    window: TimeWindow,
    now_millis: i64,
) -> (Vec<ThreatEntity>, usize) {
    let mut visible = Vec::with_capacity(entities.len());
    let mut invalid = 0;
    for entity in entities {
        match is_visible(entity, window, now_millis) {
            Ok(true) => visible.push(entity.clone()),
            Ok(false) => {}
            Err(e) => {
                log::warn!("{}", e);
                invalid += 1;
            }
        }
    }
    (visible, invalid)
}

/// Per-entity visibility for the presentation layer, in input order.
/// Invalid entities are reported hidden.
pub fn visibility_mask(
    entities: &[ThreatEntity],
    window: TimeWindow,
    now_millis: i64,
) -> Vec<(u64, bool)> {
    entities
        .iter()
        .map(|e| (e.id, is_visible(e, window, now_millis).unwrap_or(false)))
        .collect()
}

/// Entities whose mask entry is visible, in input order. `mask` must come
/// from `visibility_mask` over the same slice.
pub fn masked_entities(entities: &[ThreatEntity], mask: &[(u64, bool)]) -> Vec<ThreatEntity> {
    entities
        .iter()
        .zip(mask)
        .filter(|(_, (_, shown))| *shown)
        .map(|(e, _)| e.clone())
        .collect()
}
