use serde::{Deserialize, Serialize};

/// Structured advice document, rendered top to bottom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceResponse {
    pub title: String,
    pub introduction: String,
    pub sections: Vec<AdviceSection>,
    pub conclusion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceSection {
    pub heading: String,
    pub icon: AdviceIcon,
    pub points: Vec<AdvicePoint>,
}

/// Presentation glyph for a section. No behavioral effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdviceIcon {
    Plan,
    Technique,
    Mind,
}

impl AdviceIcon {
    pub const ALL: [&'static str; 3] = ["plan", "technique", "mind"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvicePoint {
    pub subheading: String,
    pub description: String,
}

impl AdviceResponse {
    /// Flatten the document into one passage for text-to-speech, in display order.
    pub fn speech_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.title.as_str(), self.introduction.as_str()];
        for section in &self.sections {
            parts.push(section.heading.as_str());
            for point in &section.points {
                parts.push(point.subheading.as_str());
                parts.push(point.description.as_str());
            }
        }
        parts.push(self.conclusion.as_str());

        parts
            .into_iter()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| {
                if p.ends_with(['.', '!', '?', ':']) {
                    p.to_string()
                } else {
                    format!("{p}.")
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
