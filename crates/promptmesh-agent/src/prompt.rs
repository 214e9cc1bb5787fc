//! System instruction for the builder agent.
//!
//! Rebuilt from scratch each iteration so the model always sees the current
//! draft, not the one from the start of the conversation.

use promptmesh_core::{CategoryRef, DraftState, TagRef};

/// Render the per-turn system instruction from the live draft and the
/// available category/tag whitelists.
pub fn build_system_instruction(
    draft: &DraftState,
    categories: &[CategoryRef],
    tags: &[TagRef],
) -> String {
    let draft_json = serde_json::to_string_pretty(draft)
        .unwrap_or_else(|_| "{}".to_string());
    let category_names = name_list(categories.iter().map(|c| c.name.as_str()));
    let tag_names = name_list(tags.iter().map(|t| t.name.as_str()));

    format!(
        r#"You are a prompt-building assistant. You help the user craft a prompt for an AI prompt library through conversation, editing a shared draft with tools.

Current draft state:
{draft_json}

Available categories: {category_names}
Available tags: {tag_names}

Rules:
- Use the tools to edit the draft; never paste draft fields into your replies.
- Only use category and tag names from the lists above.
- Make the edits the user asks for, then reply briefly with what you changed and one question or suggestion to move the draft forward.
- Keep replies short and conversational."#
    )
}

fn name_list<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let joined = names.collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "(none)".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_instruction_reflects_current_draft() {
        let draft = DraftState {
            title: "Weekly report".to_string(),
            ..DraftState::default()
        };
        let instruction = build_system_instruction(&draft, &[], &[]);
        assert!(instruction.contains("Weekly report"));
        assert!(instruction.contains("Available categories: (none)"));
    }

    #[test]
    fn test_instruction_lists_whitelists() {
        let categories = vec![
            CategoryRef {
                id: Uuid::new_v4(),
                name: "Writing".to_string(),
            },
            CategoryRef {
                id: Uuid::new_v4(),
                name: "Coding".to_string(),
            },
        ];
        let tags = vec![TagRef {
            id: Uuid::new_v4(),
            name: "email".to_string(),
        }];
        let instruction = build_system_instruction(&DraftState::default(), &categories, &tags);
        assert!(instruction.contains("Writing, Coding"));
        assert!(instruction.contains("Available tags: email"));
    }
}
