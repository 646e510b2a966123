//! Renders a candidate set into a sectioned choice board.
//!
//! Candidates are grouped by status (Active, then Hatched, then Eggs, empty
//! sections omitted) while the returned markers stay aligned 1:1 with the
//! original candidate ordering, so marker index N always means candidate N.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::platform::Marker;
use crate::raids::{Raid, RaidStatus};
use crate::services::travel::TravelTimeService;
use crate::utils::emoji::{choice_markers, MAX_CHOICES};

/// A rendered choice prompt: MarkdownV2 text plus the markers to attach,
/// in candidate order.
#[derive(Debug, Clone)]
pub struct ChoiceBoard {
    pub text: String,
    pub markers: Vec<Marker>,
}

/// Renders `raids` into a board, looking up travel times from `origin`'s
/// gym when it has one. Every per-candidate failure degrades that entry to
/// "Unknown" rather than aborting the render.
pub async fn render_choices(
    raids: &[Arc<Raid>],
    origin: Option<&Raid>,
    travel: &dyn TravelTimeService,
) -> ChoiceBoard {
    if raids.len() > MAX_CHOICES {
        debug!(
            offered = MAX_CHOICES,
            dropped = raids.len() - MAX_CHOICES,
            "more candidates than markers, truncating"
        );
    }
    let markers = choice_markers(raids.len());
    let shown = &raids[..markers.len()];
    let times = travel_lookup(origin, shown, travel).await;

    let mut active = Vec::new();
    let mut hatched = Vec::new();
    let mut eggs = Vec::new();
    for (raid, marker) in shown.iter().zip(&markers) {
        let travel_line = match raid.site.gym().and_then(|gym| times.get(&gym.id)) {
            Some(secs) => format!("Travel Time: {} mins", secs / 60),
            None => "Travel Time: Unknown".to_string(),
        };
        let entry = format!(
            "{} {}\n[{}]({})",
            marker,
            raid.summary().await,
            travel_line,
            raid.site.route_url()
        );
        match raid.status().await {
            RaidStatus::Active => active.push(entry),
            RaidStatus::Hatched => hatched.push(entry),
            RaidStatus::Egg => eggs.push(entry),
        }
    }

    let mut sections = vec!["*Raid Choices*".to_string()];
    for (title, entries) in [("Active", active), ("Hatched", hatched), ("Eggs", eggs)] {
        if !entries.is_empty() {
            sections.push(format!("*{}*\n{}", title, entries.join("\n\n")));
        }
    }

    ChoiceBoard {
        text: sections.join("\n\n"),
        markers,
    }
}

/// Travel seconds by destination gym id. Empty when the origin is absent or
/// unmapped, or when the lookup fails; callers render those as Unknown.
pub async fn travel_lookup(
    origin: Option<&Raid>,
    raids: &[Arc<Raid>],
    travel: &dyn TravelTimeService,
) -> HashMap<i64, i64> {
    let Some(origin_gym) = origin.and_then(|o| o.site.gym()) else {
        return HashMap::new();
    };
    let destinations: Vec<_> = raids
        .iter()
        .filter_map(|r| r.site.gym())
        .cloned()
        .collect();
    if destinations.is_empty() {
        return HashMap::new();
    }
    match travel
        .travel_times(std::slice::from_ref(origin_gym), &destinations)
        .await
    {
        Ok(estimates) => estimates
            .into_iter()
            .filter(|e| e.origin_id == origin_gym.id)
            .map(|e| (e.dest_id, e.travel_time_secs))
            .collect(),
        Err(err) => {
            warn!("travel time lookup failed: {err}");
            HashMap::new()
        }
    }
}
