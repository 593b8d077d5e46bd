//! Profile aggregation: fold classified events into a profile, derive a
//! personality label, and render a one-sentence context blurb.

use logbard_config::ProfilesConfig;
use logbard_core::profile::{ClassifiedEvent, EntityProfile, EventKind, TraitKind};

/// Subtype key prefix separating creature categories from creature names
/// inside the shared `favorite_subtypes` map.
const CATEGORY_PREFIX: &str = "category:";

// Minimum occurrences before an activity or statistic is worth mentioning.
const FAVORITE_CREATURE_MIN: u32 = 3;
const FAVORITE_CATEGORY_MIN: u32 = 4;
const BUILDING_ACTIVITY_MIN: u32 = 11;
const PVP_ACTIVITY_MIN: u32 = 6;
const DEATHS_NOTABLE_MIN: u32 = 21;
const TAMES_NOTABLE_MIN: u32 = 16;
const STRUCTURES_NOTABLE_MIN: u32 = 51;

/// Fold one classified event into a profile.
///
/// Unknown events are ignored. Every trait is clamped to [0, 1] by
/// `bump_trait`, so arbitrarily many updates of one type saturate rather
/// than overflow.
pub fn apply_event(profile: &mut EntityProfile, event: &ClassifiedEvent, cfg: &ProfilesConfig) {
    match event.kind {
        EventKind::Taming => {
            profile.bump_counter(EventKind::Taming);
            if let Some(creature) = event.details.get("creature").and_then(|v| v.as_str()) {
                profile.bump_subtype(creature);
            }
            if let Some(category) = event.details.get("creature_category").and_then(|v| v.as_str())
            {
                profile.bump_subtype(format!("{CATEGORY_PREFIX}{category}"));
            }
            profile.bump_trait(TraitKind::Tamer, cfg.taming_increment);
        }
        EventKind::Death => {
            profile.bump_counter(EventKind::Death);
            let killer = event
                .details
                .get("killed_by")
                .and_then(|v| v.as_str())
                .map(str::to_lowercase);
            if matches!(killer.as_deref(), Some("player") | Some("tribe")) {
                profile.bump_counter(EventKind::Pvp);
                profile.bump_trait(TraitKind::Aggressive, cfg.pvp_increment);
            }
        }
        EventKind::Building => {
            profile.bump_counter(EventKind::Building);
            profile.bump_trait(TraitKind::Builder, cfg.building_increment);
        }
        EventKind::Pvp => {
            profile.bump_counter(EventKind::Pvp);
            profile.bump_trait(TraitKind::Aggressive, cfg.pvp_increment);
        }
        EventKind::Chat => {
            profile.bump_counter(EventKind::Chat);
            profile.bump_trait(TraitKind::Social, cfg.chat_increment);
        }
        EventKind::Joining | EventKind::Leaving | EventKind::Tribe => {
            profile.bump_counter(event.kind);
        }
        EventKind::Unknown => {}
    }
}

/// Derive the personality label from the trait vector.
pub fn personality_label(profile: &EntityProfile) -> &'static str {
    let Some((dominant, value)) = profile.dominant_trait() else {
        return "newcomer";
    };

    if value < 0.3 {
        return "casual player";
    }

    match dominant {
        TraitKind::Tamer => "dinosaur enthusiast",
        TraitKind::Builder => "master architect",
        TraitKind::Aggressive => "PvP warrior",
        TraitKind::Social => "community leader",
        TraitKind::Explorer => "adventurous survivor",
    }
}

/// Up to three favorite activities, derived from subtype and counter tallies
/// that exceed the minimum-occurrence thresholds.
pub fn favorite_activities(profile: &EntityProfile) -> Vec<String> {
    let mut activities = Vec::new();

    let top_creature = profile
        .favorite_subtypes
        .iter()
        .filter(|(key, _)| !key.starts_with(CATEGORY_PREFIX))
        .max_by_key(|(_, count)| **count);
    if let Some((creature, count)) = top_creature {
        if *count >= FAVORITE_CREATURE_MIN {
            activities.push(format!("taming {creature}s"));
        }
    }

    let top_category = profile
        .favorite_subtypes
        .iter()
        .filter(|(key, _)| key.starts_with(CATEGORY_PREFIX))
        .max_by_key(|(_, count)| **count);
    if let Some((category, count)) = top_category {
        if *count >= FAVORITE_CATEGORY_MIN {
            let name = category.trim_start_matches(CATEGORY_PREFIX);
            activities.push(format!("{name} dinosaurs"));
        }
    }

    if profile.counter(EventKind::Building) >= BUILDING_ACTIVITY_MIN {
        activities.push("building".to_string());
    }

    if profile.counter(EventKind::Pvp) >= PVP_ACTIVITY_MIN {
        activities.push("PvP combat".to_string());
    }

    activities.truncate(3);
    activities
}

/// Up to two notable statistics worth calling out.
pub fn notable_stats(profile: &EntityProfile) -> Vec<String> {
    let mut stats = Vec::new();

    let deaths = profile.counter(EventKind::Death);
    if deaths >= DEATHS_NOTABLE_MIN {
        stats.push(format!("{deaths} deaths"));
    }

    let tames = profile.counter(EventKind::Taming);
    if tames >= TAMES_NOTABLE_MIN {
        stats.push(format!("{tames} tames"));
    }

    let structures = profile.counter(EventKind::Building);
    if structures >= STRUCTURES_NOTABLE_MIN {
        stats.push(format!("{structures} structures built"));
    }

    stats.truncate(2);
    stats
}

/// One sentence combining the label, favorite activities, and notable stats.
pub fn context_blurb(profile: &EntityProfile) -> String {
    let mut parts = vec![format!(
        "{} is a {}",
        profile.entity_name,
        personality_label(profile)
    )];

    let activities = favorite_activities(profile);
    if !activities.is_empty() {
        parts.push(format!("who loves {}", activities.join(", ")));
    }

    let stats = notable_stats(profile);
    if !stats.is_empty() {
        parts.push(format!("Notable: {}", stats.join(", ")));
    }

    parts.join(". ")
}
