//! Prompt templates. Each asks for a bare JSON answer.

pub fn summary(transcript: &str) -> String {
    format!(
        r#"Analyze this meeting transcript and provide:
1. A concise summary (2-3 sentences)
2. Key discussion points
3. Important decisions made

Format your response as JSON:
{{"summary": "...", "key_points": ["..."], "decisions": ["..."]}}

Transcript:
{transcript}

Respond ONLY with valid JSON, no additional text."#
    )
}

pub fn action_items(transcript: &str) -> String {
    format!(
        r#"Extract action items from this meeting transcript.
For each action item give:
- task: what needs to be done
- owner: who is responsible, as named in the transcript
- due_date: when it is due (YYYY-MM-DD, estimate if needed)
- priority: high, medium or low

Format as a JSON array:
[{{"task": "...", "owner": "...", "due_date": "YYYY-MM-DD", "priority": "medium"}}]

Transcript:
{transcript}

Respond ONLY with a valid JSON array. Return [] if there are no action items."#
    )
}

pub fn emotions(transcript: &str) -> String {
    format!(
        r#"Analyze the emotional tone of this meeting transcript.
For at most 5 key moments give:
- timestamp: "MM:SS"
- emotion: happy, neutral, concerned or frustrated
- intensity: 0.0 to 1.0

Format as a JSON array:
[{{"timestamp": "00:00", "emotion": "neutral", "intensity": 0.5}}]

Transcript:
{transcript}

Respond ONLY with a valid JSON array."#
    )
}
