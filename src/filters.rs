use crate::models::{Message, SearchFilter};

/// Evaluate every active filter against a message. Filters compose with
/// logical AND; unset filters always pass.
pub fn matches(filter: &SearchFilter, message: &Message) -> bool {
    within_date_range(filter, message)
        && agent_allowed(filter, message)
        && kind_allowed(filter, message)
        && attachments_allowed(filter, message)
}

fn within_date_range(filter: &SearchFilter, message: &Message) -> bool {
    if let Some(after) = filter.after
        && message.timestamp < after
    {
        return false;
    }
    if let Some(before) = filter.before
        && message.timestamp > before
    {
        return false;
    }
    true
}

fn agent_allowed(filter: &SearchFilter, message: &Message) -> bool {
    filter.agents.is_empty()
        || filter
            .agents
            .iter()
            .any(|a| a.eq_ignore_ascii_case(&message.agent))
}

fn kind_allowed(filter: &SearchFilter, message: &Message) -> bool {
    filter.kinds.is_empty() || filter.kinds.contains(&message.kind)
}

fn attachments_allowed(filter: &SearchFilter, message: &Message) -> bool {
    match filter.has_attachments {
        Some(true) => !message.attachments.is_empty(),
        Some(false) => message.attachments.is_empty(),
        None => true,
    }
}
