use std::error::Error;
use std::fmt;
use std::fs;
use std::sync::Arc;
use log::info;

/// Built-in system instruction for the dealership assistant. Always sent as
/// the first message of every upstream request; callers cannot override it.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an AI customer service assistant for a car dealership. Your role is to assist customers with their inquiries in a professional, friendly, and informative manner. Here are the guidelines you should follow:

1. **Politeness and Professionalism**: Always be polite and maintain a professional tone. Address the customer as \"you\" and use complete sentences.

2. **Clarity and Brevity**: Provide clear and concise answers. Avoid jargon unless the customer specifically requests technical details.

3. **Assistance with Services**: Offer help with scheduling test drives, maintenance appointments, and answering questions about vehicle availability, features, and pricing.

4. **Provide Accurate Information**: Make sure to provide accurate information regarding car models, features, financing options, and dealership policies.

5. **User-Friendly Suggestions**: Suggest alternatives if the requested information or service is unavailable, such as offering to notify the customer when a particular car model is back in stock.

6. **Safety and Compliance**: Never provide legal or financial advice. Always suggest that the customer contact a dealership representative for complex inquiries.

7. **Handle Complaints Gracefully**: If a customer is upset or has a complaint, acknowledge their concerns, apologize for any inconvenience, and offer to assist in resolving the issue or direct them to the appropriate person.

8. **Language and Tone**: Maintain a warm and helpful tone, similar to that of a knowledgeable and approachable car dealership representative.

9. **Always be Helpful**: Your goal is to ensure that every customer interaction is positive and helpful, leaving the customer satisfied with their experience.";

#[derive(Debug)]
pub enum PromptError {
    EmptyPrompt(String),
    IoError(String, std::io::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::EmptyPrompt(path) =>
                write!(f, "System prompt file '{}' is empty", path),
            PromptError::IoError(path, e) =>
                write!(f, "Failed to read system prompt file '{}': {}", path, e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(_, e) => Some(e),
            _ => None,
        }
    }
}

/// Resolves the system instruction once at startup: the built-in default,
/// or the contents of an override file when a path is configured.
pub fn load_system_prompt(path: Option<&str>) -> Result<Arc<str>, PromptError> {
    let prompt = match path {
        Some(path) => {
            let file_content = fs
                ::read_to_string(path)
                .map_err(|e| PromptError::IoError(path.to_string(), e))?;
            let trimmed = file_content.trim();
            if trimmed.is_empty() {
                return Err(PromptError::EmptyPrompt(path.to_string()));
            }
            info!("Loaded system prompt override from '{}'", path);
            Arc::from(trimmed)
        }
        None => Arc::from(DEFAULT_SYSTEM_PROMPT),
    };
    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_prompt_when_no_override() {
        let prompt = load_system_prompt(None).unwrap();
        assert_eq!(&*prompt, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn override_file_is_trimmed() {
        let dir = std::env::temp_dir().join("showroom-agent-prompt-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("prompt.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "  Be terse.  ").unwrap();

        let prompt = load_system_prompt(path.to_str()).unwrap();
        assert_eq!(&*prompt, "Be terse.");
    }

    #[test]
    fn empty_override_file_is_an_error() {
        let dir = std::env::temp_dir().join("showroom-agent-prompt-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("empty.txt");
        std::fs::write(&path, "   \n").unwrap();

        let err = load_system_prompt(path.to_str()).unwrap_err();
        assert!(matches!(err, PromptError::EmptyPrompt(_)));
    }

    #[test]
    fn missing_override_file_is_an_error() {
        let err = load_system_prompt(Some("/nonexistent/prompt.txt")).unwrap_err();
        assert!(matches!(err, PromptError::IoError(_, _)));
    }
}
