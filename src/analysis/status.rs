use crate::report::types::{EventImportance, StoryStatus, TimelineEvent};

/// Story status implied by the timeline, used when the synthesis step did
/// not give a usable one.
pub fn infer_story_status(timeline: &[TimelineEvent]) -> StoryStatus {
    let mut events: Vec<&TimelineEvent> = timeline.iter().collect();
    events.sort_by_key(|e| e.date);

    let (Some(first), Some(last)) = (events.first(), events.last()) else {
        return StoryStatus::Developing;
    };
    if events.len() < 2 {
        return StoryStatus::Developing;
    }

    let earlier = &events[..events.len() - 1];
    if last.importance == EventImportance::Low
        && earlier.iter().any(|e| e.importance == EventImportance::High)
    {
        return StoryStatus::DeEscalating;
    }
    if last.importance > first.importance {
        return StoryStatus::Escalating;
    }
    if events.iter().all(|e| e.importance == first.importance) {
        return StoryStatus::Static;
    }
    StoryStatus::Developing
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event(day: u32, importance: EventImportance) -> TimelineEvent {
        TimelineEvent {
            date: Utc.with_ymd_and_hms(2025, 3, day, 0, 0, 0).unwrap(),
            description: format!("day {}", day),
            importance,
        }
    }

    #[test]
    fn test_inference_rules() {
        use EventImportance::*;
        assert_eq!(infer_story_status(&[]), StoryStatus::Developing);
        assert_eq!(infer_story_status(&[event(1, High)]), StoryStatus::Developing);
        assert_eq!(
            infer_story_status(&[event(3, Low), event(1, High)]),
            StoryStatus::DeEscalating
        );
        assert_eq!(
            infer_story_status(&[event(1, Low), event(2, Medium), event(3, High)]),
            StoryStatus::Escalating
        );
        assert_eq!(
            infer_story_status(&[event(1, Medium), event(2, Medium)]),
            StoryStatus::Static
        );
        assert_eq!(
            infer_story_status(&[event(1, Medium), event(2, High), event(3, Medium)]),
            StoryStatus::Developing
        );
    }
}
