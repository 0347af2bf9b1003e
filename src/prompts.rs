//! Prompts for the resume scoring call.
//!
//! Every prompt lives here so a wording change touches exactly one place and
//! unit tests can inspect prompts without calling a model.

/// Schema the scoring model must answer with.
///
/// Mirrors [`crate::record::StructuredFeedback`].
pub const AI_RESPONSE_FORMAT: &str = r#"interface Feedback {
  overallScore: number; //max 100
  ATS: {
    score: number; //rate based on ATS suitability
    tips: {
      type: "good" | "improve";
      tip: string; //give 3-4 tips
    }[];
  };
  toneAndStyle: {
    score: number; //max 100
    tips: {
      type: "good" | "improve";
      tip: string; //make it a short "title" for the actual explanation
      explanation: string; //explain in detail here
    }[]; //give 3-4 tips
  };
  content: {
    score: number; //max 100
    tips: {
      type: "good" | "improve";
      tip: string; //make it a short "title" for the actual explanation
      explanation: string; //explain in detail here
    }[]; //give 3-4 tips
  };
  structure: {
    score: number; //max 100
    tips: {
      type: "good" | "improve";
      tip: string; //make it a short "title" for the actual explanation
      explanation: string; //explain in detail here
    }[]; //give 3-4 tips
  };
  skills: {
    score: number; //max 100
    tips: {
      type: "good" | "improve";
      tip: string; //make it a short "title" for the actual explanation
      explanation: string; //explain in detail here
    }[]; //give 3-4 tips
  };
}"#;

/// System message sent ahead of the instructions by the LLM scorer.
pub const SCORING_SYSTEM_PROMPT: &str = "You are an expert in ATS (Applicant Tracking System) \
and resume analysis. You answer with a single JSON object and nothing else.";

/// Build the scoring instructions for one submission.
pub fn prepare_instructions(job_title: &str, job_description: &str) -> String {
    format!(
        "You are an expert in ATS (Applicant Tracking System) and resume analysis.\n\
Please analyze and rate this resume and suggest how to improve it.\n\
The rating can be low if the resume is bad.\n\
Be thorough and detailed. Don't be afraid to point out any mistakes or areas for improvement.\n\
If there is a lot to improve, don't hesitate to give low scores. This is to help the user to improve their resume.\n\
If available, use the job description for the job user is applying to to give more detailed feedback.\n\
If provided, take the job description into consideration.\n\
The job title is: {job_title}\n\
The job description is: {job_description}\n\
Provide the feedback using the following format: {AI_RESPONSE_FORMAT}\n\
Return the analysis as a JSON object, without any other text and without the backticks.\n\
Do not include any other text or comments."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_embed_job_and_schema() {
        let text = prepare_instructions("Engineer", "Build things");
        assert!(text.contains("The job title is: Engineer"));
        assert!(text.contains("The job description is: Build things"));
        assert!(text.contains("overallScore: number"));
        assert!(text.contains("without the backticks"));
    }
}
