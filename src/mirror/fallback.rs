use serde_json::{json, Value};

/// Canned preview shown when onboarding-preview generation fails
///
/// Same shape as a generated preview so the app renders it unchanged.
pub fn preview_fallback() -> Value {
    json!({
        "themes": {
            "title": "What we noticed",
            "themes": [
                {
                    "name": "Seeking God",
                    "description": "Your words show a desire to draw closer to God and to understand what He is doing in your life."
                },
                {
                    "name": "Honest Reflection",
                    "description": "You are willing to look openly at where you are, which is where real growth begins."
                }
            ]
        },
        "biblical": {
            "parallel_story": {
                "character": "David",
                "scripture_reference": "Psalm 139",
                "story": "David poured out his heart to God in every season, from great joy to deep distress, and asked God to search and know him.",
                "connection": "Like David, you are bringing your real thoughts before God. He meets people in that honesty."
            },
            "encouraging_verse": {
                "reference": "Jeremiah 29:13",
                "text": "You will seek me and find me when you seek me with all your heart.",
                "reflection": "Taking time to reflect is a way of seeking Him, and He promises to be found."
            },
            "invitation_to_growth": {
                "title": "Keep showing up",
                "invitation": "Journal a few more times this week. Over time, your Mirror will reveal patterns you cannot see from a single entry.",
                "practical_steps": [
                    "Set aside five quiet minutes each day to write",
                    "End each entry with one thing you are grateful for"
                ]
            }
        },
        "observations": {
            "title": "A first glimpse",
            "patterns": ["You are taking a first step toward a regular rhythm of reflection."],
            "growth": ["Choosing to start is itself a sign of spiritual openness."]
        }
    })
}
