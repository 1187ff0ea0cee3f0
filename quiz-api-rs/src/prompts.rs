// quiz-api-rs/src/prompts.rs
//
// Prompt templates for the two quiz operations.
//
// Both templates instruct the model to reply in a single-quoted pseudo-JSON
// shape; the coercion stage (coerce.rs) depends on that shape. The wording is
// part of the contract with the deployed model, so it stays fixed here rather
// than being assembled dynamically.

/// Build the prompt asking the model to generate a question for a test.
pub fn build_generate_question_prompt(testname: &str, testdescription: &str) -> String {
    format!(
        "Generate a question of test: {}, test description: {}. \
         Respond with this format: \
         {{ 'Question': '<question>', 'Answer': '<answer>', 'Explanation': '<explanation>' }}.",
        testname, testdescription
    )
}

/// Build the prompt asking the model to score a user's answer out of 100.
pub fn build_score_answer_prompt(
    testname: &str,
    testdescription: &str,
    testquestion: &str,
    realanswer: &str,
    useranswer: &str,
) -> String {
    format!(
        "Here is the Test name: {}\n\
         and test desciption: {}\n\
         Evaluate the user's answer for the following question:\n\
         Question: {}\n\
         Correct Answer: {}\n\
         User Answer: {}\n\
         Provide a score out of 100 with a brief explanation. \
         Respond in this format: {{ 'Score': '<score>', 'Feedback': '<feedback>' }}.",
        testname, testdescription, testquestion, realanswer, useranswer
    )
}
