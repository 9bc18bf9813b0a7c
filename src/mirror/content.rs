/// Typed Mirror content
///
/// Core output is required and deserialized into strict structs; verse and
/// invitation are optional and ride along inside the biblical screen.
use crate::db::{MirrorType, SpiritualPlace};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Core payload of a standard Mirror or preview
#[derive(Debug, Clone, Deserialize)]
pub struct StandardCore {
    pub themes: Value,
    pub parallel_story: Value,
    pub observations: Value,
}

/// Core payload of a Day 1 mini-Mirror
#[derive(Debug, Clone, Deserialize)]
pub struct Day1Core {
    pub one_line_summaries: Vec<String>,
    pub parallel_story: Value,
}

/// Screen 2: the biblical parallel and its optional companions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiblicalScreen {
    pub parallel_story: Value,
    pub encouraging_verse: Option<Value>,
    pub invitation_to_growth: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MirrorContent {
    Standard {
        themes: Value,
        biblical: BiblicalScreen,
        observations: Value,
    },
    Day1 {
        summaries: Vec<String>,
        biblical: BiblicalScreen,
    },
}

/// Screen payloads as stored on a Mirror row
#[derive(Debug, Clone, PartialEq)]
pub struct Screens {
    pub themes: Value,
    pub biblical: Value,
    pub observations: Option<Value>,
}

impl MirrorContent {
    pub fn mirror_type(&self) -> MirrorType {
        match self {
            MirrorContent::Standard { .. } => MirrorType::Standard,
            MirrorContent::Day1 { .. } => MirrorType::Day1,
        }
    }

    pub fn biblical(&self) -> &BiblicalScreen {
        match self {
            MirrorContent::Standard { biblical, .. } | MirrorContent::Day1 { biblical, .. } => {
                biblical
            }
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Split into the per-screen JSON columns
    ///
    /// Day 1 content keeps the user's spiritual place next to the summaries.
    pub fn into_screens(self, spiritual_place: Option<SpiritualPlace>) -> Screens {
        match self {
            MirrorContent::Standard {
                themes,
                biblical,
                observations,
            } => Screens {
                themes,
                biblical: biblical_json(biblical),
                observations: Some(observations),
            },
            MirrorContent::Day1 {
                summaries,
                biblical,
            } => Screens {
                themes: json!({
                    "one_line_summaries": summaries,
                    "spiritual_place": spiritual_place.map(|p| p.as_str()),
                }),
                biblical: biblical_json(biblical),
                observations: None,
            },
        }
    }
}

fn biblical_json(biblical: BiblicalScreen) -> Value {
    serde_json::to_value(biblical).unwrap_or(Value::Null)
}
