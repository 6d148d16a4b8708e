// Sentiment-analysis LLM prompt for free-text nudge replies.

pub const SENTIMENT_SYSTEM: &str = "\
You classify user replies to task reminders. \
You MUST respond with valid JSON only — no markdown fences.";

const SENTIMENT_TEMPLATE: &str = r#"Classify the sentiment of this user's reply to a task nudge.

User's reply: "{response_text}"

Classify as exactly one of: positive, neutral, busy, dismissive

Also determine if nudges should be paused and for how long:
- If busy/dismissive: suggest a pause duration in hours (1-12)
- If positive/neutral: pause_hours should be 0

Return ONLY valid JSON:
{
  "sentiment": "<positive|neutral|busy|dismissive>",
  "pause_hours": <number>,
  "brief_ack": "<friendly 1 sentence acknowledgment to send back>"
}

JSON only, no markdown fences:"#;

pub fn sentiment_prompt(response_text: &str) -> String {
    SENTIMENT_TEMPLATE.replace("{response_text}", response_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_prompt_embeds_reply() {
        let prompt = sentiment_prompt("can't right now, swamped");
        assert!(prompt.contains("\"can't right now, swamped\""));
        assert!(!prompt.contains("{response_text}"));
    }
}
