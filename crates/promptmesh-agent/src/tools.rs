//! Draft-editing tools exposed to the model.
//!
//! Every mutation of the draft goes through a named tool with a JSON schema.
//! Unknown tools and malformed inputs produce a rejection payload and leave
//! the draft untouched.

use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use promptmesh_core::{CategoryRef, DraftState, PromptType, TagRef};
use promptmesh_inference::ToolSpec;

/// Parsed, validated tool operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOp {
    SetTitle { title: String },
    SetDescription { description: String },
    SetContent { content: String },
    SetType { prompt_type: PromptType },
    SetCategory { name: String },
    ToggleTag { name: String },
    SetPrivacy { is_private: bool },
}

/// Outcome of one tool application, serialized back to the model as the
/// tool result content.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub ok: bool,
    pub message: String,
}

impl ToolOutcome {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }

    /// JSON payload handed back to the model.
    pub fn payload(&self) -> String {
        json!({ "ok": self.ok, "message": self.message }).to_string()
    }
}

#[derive(Deserialize)]
struct TitleInput {
    title: String,
}

#[derive(Deserialize)]
struct DescriptionInput {
    description: String,
}

#[derive(Deserialize)]
struct ContentInput {
    content: String,
}

#[derive(Deserialize)]
struct TypeInput {
    #[serde(rename = "type")]
    prompt_type: PromptType,
}

#[derive(Deserialize)]
struct NameInput {
    name: String,
}

#[derive(Deserialize)]
struct PrivacyInput {
    is_private: bool,
}

/// Parse a raw tool call into a validated operation.
///
/// `Err` carries the rejection message for the model; the caller must not
/// mutate the draft in that case.
pub fn parse_tool_call(name: &str, input: &JsonValue) -> Result<ToolOp, String> {
    match name {
        "set_title" => from_input::<TitleInput>(input).map(|i| ToolOp::SetTitle { title: i.title }),
        "set_description" => from_input::<DescriptionInput>(input).map(|i| ToolOp::SetDescription {
            description: i.description,
        }),
        "set_content" => from_input::<ContentInput>(input).map(|i| ToolOp::SetContent {
            content: i.content,
        }),
        "set_type" => from_input::<TypeInput>(input).map(|i| ToolOp::SetType {
            prompt_type: i.prompt_type,
        }),
        "set_category" => from_input::<NameInput>(input).map(|i| ToolOp::SetCategory { name: i.name }),
        "toggle_tag" => from_input::<NameInput>(input).map(|i| ToolOp::ToggleTag { name: i.name }),
        "set_privacy" => from_input::<PrivacyInput>(input).map(|i| ToolOp::SetPrivacy {
            is_private: i.is_private,
        }),
        other => Err(format!("Unknown tool: {}", other)),
    }
}

fn from_input<T: serde::de::DeserializeOwned>(input: &JsonValue) -> Result<T, String> {
    serde_json::from_value(input.clone()).map_err(|err| format!("Invalid tool input: {}", err))
}

/// Apply a validated operation to the draft. Category and tag names are
/// resolved against the caller-supplied whitelists; unknown names reject
/// without mutating anything.
pub fn apply_tool_op(
    draft: &mut DraftState,
    op: &ToolOp,
    categories: &[CategoryRef],
    tags: &[TagRef],
) -> ToolOutcome {
    match op {
        ToolOp::SetTitle { title } => {
            draft.title = title.clone();
            ToolOutcome::ok("Title updated")
        }
        ToolOp::SetDescription { description } => {
            draft.description = description.clone();
            ToolOutcome::ok("Description updated")
        }
        ToolOp::SetContent { content } => {
            draft.content = content.clone();
            ToolOutcome::ok("Content updated")
        }
        ToolOp::SetType { prompt_type } => {
            draft.prompt_type = Some(*prompt_type);
            ToolOutcome::ok(format!("Type set to {}", prompt_type))
        }
        ToolOp::SetCategory { name } => {
            match categories
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(name))
            {
                Some(category) => {
                    draft.category_id = Some(category.id);
                    ToolOutcome::ok(format!("Category set to {}", category.name))
                }
                None => ToolOutcome::rejected(format!("Unknown category: {}", name)),
            }
        }
        ToolOp::ToggleTag { name } => {
            match tags.iter().find(|t| t.name.eq_ignore_ascii_case(name)) {
                Some(tag) => {
                    if let Some(pos) = draft.tag_ids.iter().position(|id| *id == tag.id) {
                        draft.tag_ids.remove(pos);
                        ToolOutcome::ok(format!("Tag {} removed", tag.name))
                    } else {
                        draft.tag_ids.push(tag.id);
                        ToolOutcome::ok(format!("Tag {} added", tag.name))
                    }
                }
                None => ToolOutcome::rejected(format!("Unknown tag: {}", name)),
            }
        }
        ToolOp::SetPrivacy { is_private } => {
            draft.is_private = *is_private;
            ToolOutcome::ok(if *is_private {
                "Prompt set to private"
            } else {
                "Prompt set to public"
            })
        }
    }
}

/// Tool declarations sent to the model each turn.
pub fn tool_definitions() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "set_title".to_string(),
            description: "Set the title of the prompt being built.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": { "title": { "type": "string" } },
                "required": ["title"]
            }),
        },
        ToolSpec {
            name: "set_description".to_string(),
            description: "Set the short description of the prompt.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": { "description": { "type": "string" } },
                "required": ["description"]
            }),
        },
        ToolSpec {
            name: "set_content".to_string(),
            description: "Set the full prompt text.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": { "content": { "type": "string" } },
                "required": ["content"]
            }),
        },
        ToolSpec {
            name: "set_type".to_string(),
            description: "Set the output type of the prompt.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "type": { "type": "string", "enum": ["TEXT", "IMAGE", "VIDEO", "AUDIO"] }
                },
                "required": ["type"]
            }),
        },
        ToolSpec {
            name: "set_category".to_string(),
            description: "Assign the prompt to a category by name. Only listed categories are valid.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": { "name": { "type": "string" } },
                "required": ["name"]
            }),
        },
        ToolSpec {
            name: "toggle_tag".to_string(),
            description: "Add a tag by name, or remove it if already present. Only listed tags are valid.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": { "name": { "type": "string" } },
                "required": ["name"]
            }),
        },
        ToolSpec {
            name: "set_privacy".to_string(),
            description: "Mark the prompt private or public.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": { "is_private": { "type": "boolean" } },
                "required": ["is_private"]
            }),
        },
    ]
}
