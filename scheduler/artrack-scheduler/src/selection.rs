/// Inputs to one round of active-target selection, gathered from this
/// frame's successful `PerTarget` results. `candidates` excludes the current
/// active target; `current_distance` is only meaningful when
/// `current_active_succeeded` is true.
pub struct SelectionInput<'a> {
    pub current_active: Option<&'a str>,
    pub current_active_succeeded: bool,
    pub current_distance: f32,
    pub candidates: &'a [(String, f32)],
    pub switch_hysteresis: f32,
    pub delay_elapsed: bool,
}

/// Picks the active target for this frame. A candidate other than the
/// current active one only takes over when it is strictly closer to frame
/// center by `switch_hysteresis` (a candidate "close enough" but not closer
/// doesn't cause churn) and `min_switch_delay_ms` has elapsed since the last
/// switch. A failed active target is handed off immediately (no hysteresis,
/// no delay) to the closest surviving candidate, or cleared if nothing else
/// is visible this frame — `activeTargetId` may never name a target that
/// didn't succeed this frame.
pub fn select_active(input: SelectionInput) -> Option<String> {
    let closest = closest_candidate(input.candidates);

    match (input.current_active, input.current_active_succeeded) {
        (None, _) => closest.map(|(id, _)| id.clone()),
        (Some(active_id), true) => {
            if let Some((closest_id, closest_distance)) = closest {
                if input.delay_elapsed && closest_distance < input.switch_hysteresis * input.current_distance {
                    return Some(closest_id.clone());
                }
            }
            Some(active_id.to_string())
        }
        (Some(_), false) => closest.map(|(id, _)| id.clone()),
    }
}

fn closest_candidate(candidates: &[(String, f32)]) -> Option<(&String, f32)> {
    candidates
        .iter()
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(id, d)| (id, *d))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_start_picks_the_closest_candidate() {
        let candidates = vec![("a".to_string(), 50.0), ("b".to_string(), 10.0)];
        let input = SelectionInput {
            current_active: None,
            current_active_succeeded: false,
            current_distance: 0.0,
            candidates: &candidates,
            switch_hysteresis: 0.7,
            delay_elapsed: true,
        };
        assert_eq!(select_active(input), Some("b".to_string()));
    }

    #[test]
    fn hysteresis_blocks_a_marginally_closer_candidate() {
        let candidates = vec![("b".to_string(), 8.0)];
        let input = SelectionInput {
            current_active: Some("a"),
            current_active_succeeded: true,
            current_distance: 10.0,
            candidates: &candidates,
            switch_hysteresis: 0.7,
            delay_elapsed: true,
        };
        // 8.0 is not < 0.7 * 10.0 = 7.0, so "a" keeps its focus.
        assert_eq!(select_active(input), Some("a".to_string()));
    }

    #[test]
    fn a_sufficiently_closer_candidate_takes_over() {
        let candidates = vec![("b".to_string(), 5.0)];
        let input = SelectionInput {
            current_active: Some("a"),
            current_active_succeeded: true,
            current_distance: 10.0,
            candidates: &candidates,
            switch_hysteresis: 0.7,
            delay_elapsed: true,
        };
        assert_eq!(select_active(input), Some("b".to_string()));
    }

    #[test]
    fn switch_delay_blocks_an_otherwise_qualifying_switch() {
        let candidates = vec![("b".to_string(), 1.0)];
        let input = SelectionInput {
            current_active: Some("a"),
            current_active_succeeded: true,
            current_distance: 10.0,
            candidates: &candidates,
            switch_hysteresis: 0.7,
            delay_elapsed: false,
        };
        assert_eq!(select_active(input), Some("a".to_string()));
    }

    #[test]
    fn occluded_active_target_is_cleared_with_no_other_candidates() {
        let candidates: Vec<(String, f32)> = Vec::new();
        let input = SelectionInput {
            current_active: Some("a"),
            current_active_succeeded: false,
            current_distance: 0.0,
            candidates: &candidates,
            switch_hysteresis: 0.7,
            delay_elapsed: true,
        };
        assert_eq!(select_active(input), None);
    }

    #[test]
    fn occluded_active_target_hands_off_to_a_visible_candidate() {
        let candidates = vec![("b".to_string(), 3.0)];
        let input = SelectionInput {
            current_active: Some("a"),
            current_active_succeeded: false,
            current_distance: 0.0,
            candidates: &candidates,
            switch_hysteresis: 0.7,
            delay_elapsed: true,
        };
        assert_eq!(select_active(input), Some("b".to_string()));
    }
}
