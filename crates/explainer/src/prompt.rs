//! Explainer prompt template

use contracts::Message;

pub const EXPLAINER_SYSTEM_PROMPT: &str = "You are a meticulous AI researcher conducting an important investigation into a certain neuron in a language model. Your task is to analyze the neuron and provide an explanation that thoroughly encapsulates its behavior.

You will be given a list of text examples on which the neuron activates. Each example is followed by the tokens the neuron activates on, with a score from 0 to 10 in parentheses giving how strongly it fires.

Look for patterns in the activating tokens and in the surrounding text. Keep the explanation short: a few words or one sentence.

End your answer with a single line of the form:
Explanation: <your explanation>";

const EXAMPLE_ONE: &str = "Neuron
Document 1:
and he was over the moon to find
Activating tokens: over (7), the (6), moon (10).

Document 2:
we'll be laughing till the cows come home! Pro
Activating tokens: till (5), the (5), cows (8), come (9), home (10).

";

const RESPONSE_ONE: &str = "The activating tokens are all parts of common idioms. The surrounding text is informal and expressive.
Explanation: Common idioms in text conveying positive sentiment.";

const EXAMPLE_TWO: &str = "Neuron
Document 1:
a river is wide but the ocean is wider. The ocean
Activating tokens: wider (8).

Document 2:
every year you get taller,\" she said
Activating tokens: taller (7).

";

const RESPONSE_TWO: &str = "Every activating token is a comparative adjective ending in \"er\".
Explanation: The comparative suffix \"er\" on adjectives.";

/// Few-shot message sequence ending in the question for `examples`
pub fn build_messages(examples: &str) -> Vec<Message> {
    vec![
        Message::system(EXPLAINER_SYSTEM_PROMPT),
        Message::user(EXAMPLE_ONE),
        Message::assistant(RESPONSE_ONE),
        Message::user(EXAMPLE_TWO),
        Message::assistant(RESPONSE_TWO),
        Message::user(examples),
    ]
}
