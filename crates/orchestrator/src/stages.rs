//! Built-in tutoring stage table.
//!
//! | stage       | required_inputs                                                | output_key           |
//! |-------------|----------------------------------------------------------------|----------------------|
//! | Intro       | topic, background, name, course, course_expertise              | intro_response       |
//! | KeyConcepts | intro_response, topic                                          | keyconcepts_response |
//! | Application | keyconcepts_response, background                               | application_response |
//! | Example     | application_response                                           | example_response     |
//! | Analyze     | example_response, application_response, keyconcepts_response   | analyze_response     |
//! | Visualize   | example_response, analyze_response, topic                      | visualize_response   |

use contracts::StageDefinition;

pub const INTRO: &str = "Intro";
pub const KEY_CONCEPTS: &str = "KeyConcepts";
pub const APPLICATION: &str = "Application";
pub const EXAMPLE: &str = "Example";
pub const ANALYZE: &str = "Analyze";
pub const VISUALIZE: &str = "Visualize";

/// Stage names in execution order
pub const STAGE_ORDER: [&str; 6] = [
    INTRO,
    KEY_CONCEPTS,
    APPLICATION,
    EXAMPLE,
    ANALYZE,
    VISUALIZE,
];

const TUTOR_SYSTEM: &str = "\
You are an engaged, humorous and personable expert tutor who helps students by explaining the purpose and use of various concepts in {course}.

You will always provide assumptions and what needs to be considered and established prior to, during and after using this for {course}.

The student's name you are speaking to is {name}. The student is interested in {background}.

The student needs to hear your response to match their {course_expertise} level of topic understanding with {topic}.

Make your responses relevant to {background}.
";

const INTRO_PROMPT: &str = "\
Please briefly define and overview the topic of {topic} in {course} relevant to {background}.

ONLY return a top level introduction to this topic. Limit the output to less than 100 words.
";

const KEY_CONCEPTS_PROMPT: &str = "\
Based on the response of {intro_response}:
Please provide the following output:
 - Begin with stating that what you are providing are the key concepts for this topic of {topic} you need to be aware of to effectively apply this.

 - Next, generate a detailed numbered list of the key concepts I should be aware of when using {topic}. The output should define the concept and discuss its role and importance related to this topic. Explain any assumptions or tools or methods related to each concept that should be considered.

Provide your output response in JSON format to make it easy to parse. The JSON formatted key concepts should be in the format shown in the area below delineated by ####:

####
\"1\": \"Concept 1 ...\",
\"2\": \"Concept 2 ...\"
####

Limit the output to less than 300 words.
";

const APPLICATION_PROMPT: &str = "\
Based on the response of {keyconcepts_response}:
Please provide a relevant example that demonstrates and clarifies each of these key concepts. Keep in mind that the student has a background in {background}.

Your output response should address each of the key concepts listed in the last step and how it is applied with this example.
";

const EXAMPLE_PROMPT: &str = "\
Based on the response of {application_response}:
Please generate a sample dataset of the example you provided. Provide this in a tabular format on the screen.

The format of the data should be one that can be copied and pasted into a spreadsheet like Excel. In the end, return the same data in csv format as well so that the user can copy and paste it into a CSV file.
";

const ANALYZE_PROMPT: &str = "\
Based on the response of \"{example_response}\" and \"{application_response}\":
Now, please analyze this sample data addressing each of the key concepts you described in {keyconcepts_response}.

Explain each concept with details on how it relates to the example being discussed and any tools or methods that should be considered.
Provide the numeric results as appropriate for each step and what the value means.

Summarize the assumptions, context, limitations and interpretations to clarify the results of this analysis.
";

const VISUALIZE_PROMPT: &str = "\
Based on the response of {example_response} and {analyze_response}:
Please provide any visuals that illustrate {topic} as applied to this example scenario, and the analysis provided above, such that the student can learn how to interpret a real life scenario like this.

Provide an explanation for each visual and its relevance to understanding the {topic} topic.

Provide python code needed to create the visual plots for this example.
";

/// The six tutoring stages, in execution order
pub fn tutor_stages() -> Vec<StageDefinition> {
    vec![
        StageDefinition::new(INTRO, "Introduction", INTRO_PROMPT, "intro_response")
            .with_system(TUTOR_SYSTEM)
            .requires(["topic", "background", "name", "course", "course_expertise"]),
        StageDefinition::new(
            KEY_CONCEPTS,
            "Key Concepts",
            KEY_CONCEPTS_PROMPT,
            "keyconcepts_response",
        )
        .requires(["intro_response", "topic"]),
        StageDefinition::new(
            APPLICATION,
            "Application",
            APPLICATION_PROMPT,
            "application_response",
        )
        .requires(["keyconcepts_response", "background"]),
        StageDefinition::new(EXAMPLE, "Example", EXAMPLE_PROMPT, "example_response")
            .requires(["application_response"]),
        StageDefinition::new(ANALYZE, "Analysis", ANALYZE_PROMPT, "analyze_response").requires([
            "example_response",
            "application_response",
            "keyconcepts_response",
        ]),
        StageDefinition::new(
            VISUALIZE,
            "Visualization",
            VISUALIZE_PROMPT,
            "visualize_response",
        )
        .requires(["example_response", "analyze_response", "topic"]),
    ]
}
