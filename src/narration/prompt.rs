//! Narration prompts for one slide or a batch of slides.

use crate::narration::{NarrationLanguage, NarrationStyle};
use crate::store::LatestRecord;

pub const NARRATION_SYSTEM_PROMPT: &str =
    "You write presenter scripts for IR deck slides as JSON, based on the slide data.";

/// The JSON object every script reply must follow.
fn output_format(slide: u32) -> String {
    format!(
        "{{\"slideNumber\": {}, \"title\": \"\", \"narration\": \"\", \"talkPoints\": [\"\", \"\", \"\"]}}",
        slide
    )
}

pub fn slide_prompt(slide: &LatestRecord, style: NarrationStyle, language: NarrationLanguage) -> String {
    let slide_json = serde_json::to_string_pretty(&slide.record)
        .unwrap_or_else(|_| slide.record.to_string());

    format!(
        "You write the script a presenter reads aloud for one slide of a startup IR deck.\n\
         The JSON below holds the contents of slide {number}.\n\
         \n\
         [Slide data]\n\
         {slide_json}\n\
         \n\
         [Guidelines]\n\
         - Keep the tone {tone}, and write in {language}.\n\
         - narration is 2 to 3 sentences (about 170 to 260 characters) with a natural flow.\n\
         - Every sentence must carry the message of this slide.\n\
         - talkPoints holds the 3 points the presenter stresses, 25 to 40 characters each.\n\
         - Output only the JSON object below; no explanations or code fences.\n\
         \n\
         [Output format]\n\
         {format}\n\
         \n\
         - title is a 12 to 18 character heading for the slide.\n\
         - narration and talkPoints contain no line breaks.",
        number = slide.slide,
        slide_json = slide_json,
        tone = style.hint(),
        language = language.name(),
        format = output_format(slide.slide),
    )
}

/// One request for several slides: shared rules, then one section per slide.
pub fn batch_prompt(
    slides: &[LatestRecord],
    style: NarrationStyle,
    language: NarrationLanguage,
) -> String {
    let mut parts = vec![
        "You write presenter scripts for startup IR deck slides as JSON.".to_string(),
        format!("This request covers {} slides.", slides.len()),
        "Output one JSON object per slide, in slide order, with a line containing only --- between slides."
            .to_string(),
        "Add no explanations; the reply holds only JSON objects and separators.".to_string(),
        format!("Every object follows this structure: {}", output_format(0).replace(": 0,", ": <number>,")),
        "title is 12 to 18 characters, narration 2 to 3 sentences (170 to 260 characters), \
         talkPoints three summaries of 25 to 40 characters."
            .to_string(),
        "Tone and language are given in each slide section.".to_string(),
    ];

    parts.extend(slides.iter().map(|slide| {
        format!(
            "[Slide {} guidelines]\n{}",
            slide.slide,
            slide_prompt(slide, style, language)
        )
    }));

    parts.join("\n\n")
}
