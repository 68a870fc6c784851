//! Scorer prompt template

use contracts::Message;

use crate::sample::Sample;

pub const SCORER_SYSTEM_PROMPT: &str = r#"You are an intelligent and meticulous linguistics researcher.

You will be given a certain feature of text, such as "male pronouns" or "text with negative sentiment". You will be given a few examples of text that contain this feature. Portions of the sentence which strongly represent this feature are between tokens << and >>.

Some examples might be mislabeled. Your task is to determine if every single token within << and >> is correctly labeled. Consider that all provided examples could be correct, none of the examples could be correct, or a mix.

For each example in turn, return 1 if the sentence is correct or 0 if the tokens are mislabeled.

Your response must be a JSON object with exactly one field per example and nothing else:

{
  "example_1": 0,
  "example_2": 1,
  ...
  "example_n": 1
}
"#;

const EXAMPLE_ONE: &str = "Feature explanation: Words related to American football positions, specifically the tight end position.

Text examples:

Example 1:<|endoftext|>Getty Images\n\nPatriots<< tight end>> Rob Gronkowski had his boss's
Example 2: posted<|endoftext|>You should know this about offensive<< line coaches>>: they are large, demanding men
Example 3: Media Day 2015\n\nLSU <<defensive end>> Isaiah Washington (94) speaks<< to the>>
Example 4:<< running backs>>,\" he said. .. Defensive<< end>> Carroll Phillips is improving and his injury is
Example 5:<< line>>, with the left side, namely<< tackle>> Byron Bell at<< tackle>> and<< guard>> Amini
";

const RESPONSE_ONE: &str = r#"{
  "example_1": 1,
  "example_2": 0,
  "example_3": 0,
  "example_4": 1,
  "example_5": 1
}"#;

/// `Example i:<text>` lines for one batch, numbered from 1
pub fn format_batch(batch: &[Sample]) -> String {
    batch
        .iter()
        .enumerate()
        .map(|(i, sample)| format!("Example {}:{}\n", i + 1, sample.text))
        .collect()
}

/// Few-shot message sequence ending in the batch to judge
pub fn build_messages(explanation: &str, examples: &str) -> Vec<Message> {
    let user_prompt =
        format!("Feature explanation: {explanation}\n\nText examples:\n\n{examples}\n");
    vec![
        Message::system(SCORER_SYSTEM_PROMPT),
        Message::user(EXAMPLE_ONE),
        Message::assistant(RESPONSE_ONE),
        Message::user(user_prompt),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResponseSchema;

    #[test]
    fn test_few_shot_response_matches_schema() {
        assert_eq!(
            ResponseSchema::new(5).parse(RESPONSE_ONE).unwrap(),
            vec![1, 0, 0, 1, 1]
        );
    }

    #[test]
    fn test_user_prompt_carries_explanation_and_examples() {
        let batch = vec![
            Sample {
                text: " the<< cat>>".into(),
                ground_truth: 1,
                band: Some(0),
            },
            Sample {
                text: "<< a>> dog".into(),
                ground_truth: 0,
                band: None,
            },
        ];
        let messages = build_messages("animals", &format_batch(&batch));
        let last = &messages.last().unwrap().content;
        assert!(last.starts_with("Feature explanation: animals\n"));
        assert!(last.contains("Example 1: the<< cat>>\nExample 2:<< a>> dog\n"));
    }
}
