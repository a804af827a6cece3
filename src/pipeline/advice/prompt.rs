use super::types::AdviceIcon;
use crate::pipeline::model::Schema;

/// Advisor persona, sent as the system instruction.
pub const ADVISOR_SYSTEM_PROMPT: &str = "\
You are a warm, experienced study advisor for secondary-school and university students. \
Answer in the same language as the student's message. \
Give practical, specific advice: a short title, a one-paragraph introduction, \
two to four sections, and an encouraging conclusion. \
Each section has a heading, an icon and two to four points; each point has a short subheading and a description. \
Use the icon 'plan' for scheduling and goal setting, 'technique' for study methods, \
and 'mind' for motivation, stress and wellbeing.";

/// Response contract for `AdviceResponse`.
pub fn advice_schema() -> Schema {
    let point = Schema::object(vec![
        ("subheading", Schema::String, true),
        ("description", Schema::String, true),
    ]);
    let section = Schema::object(vec![
        ("heading", Schema::String, true),
        ("icon", Schema::enumeration(&AdviceIcon::ALL), true),
        ("points", Schema::array(point), true),
    ]);
    Schema::object(vec![
        ("title", Schema::String, true),
        ("introduction", Schema::String, true),
        ("sections", Schema::array(section), true),
        ("conclusion", Schema::String, true),
    ])
}
