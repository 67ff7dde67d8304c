//! OpenAI-compatible chat-completions client.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{Purpose, TranslationError, Translator};
use crate::config::TranslationConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const RETRY_DELAY: Duration = Duration::from_secs(2);
const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 4000;

const CORRECTION_SYSTEM_PROMPT: &str =
    "You are an expert at correcting OCR errors in English poker texts. Do not translate the text.";

static RE_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());
static RE_SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+([.,;:!?)])").unwrap());

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct OpenAiTranslator {
    client: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
    target_language: String,
    retry_count: u32,
    retry_delay: Duration,
    chunk_size: usize,
    max_correction_chars: usize,
}

impl OpenAiTranslator {
    pub fn new(config: &TranslationConfig, api_key: SecretString) -> Result<Self, TranslationError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            target_language: language_name(&config.target_language),
            retry_count: config.retry_count.max(1),
            retry_delay: RETRY_DELAY,
            chunk_size: config.chunk_size.max(1),
            max_correction_chars: config.max_correction_chars,
        })
    }

    #[cfg(test)]
    fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn complete_with_retry(&self, system: &str, user: &str) -> Result<String, TranslationError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.complete(system, user) {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.retry_count && is_retryable(&e) => {
                    tracing::warn!(attempt, error = %e, "Translation request failed, retrying");
                    std::thread::sleep(self.retry_delay * attempt);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn complete(&self, system: &str, user: &str) -> Result<String, TranslationError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TranslationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| TranslationError::MalformedResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(TranslationError::EmptyResponse);
        }
        Ok(content)
    }
}

impl Translator for OpenAiTranslator {
    fn is_available(&self) -> bool {
        let result = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .send();

        match result {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(status = response.status().as_u16(), "Translation service rejected probe");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Translation service unreachable");
                false
            }
        }
    }

    fn translate(&self, text: &str, purpose: Purpose) -> Result<String, TranslationError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        if purpose == Purpose::OcrCorrection {
            if text.chars().count() > self.max_correction_chars {
                tracing::info!(
                    chars = text.chars().count(),
                    "Text too long for OCR correction, keeping it as is"
                );
                return Ok(text.to_string());
            }
            let prompt = user_prompt(text, purpose, &self.target_language);
            return self.complete_with_retry(CORRECTION_SYSTEM_PROMPT, &prompt);
        }

        let system = translation_system_prompt(&self.target_language);
        let mut translated = Vec::new();
        for chunk in split_into_chunks(text, self.chunk_size) {
            let prompt = user_prompt(&chunk, purpose, &self.target_language);
            let result = self.complete_with_retry(&system, &prompt)?;
            translated.push(post_process(&result));
        }
        Ok(translated.join("\n\n"))
    }
}

fn is_retryable(error: &TranslationError) -> bool {
    match error {
        TranslationError::Status { status, .. } => *status == 429 || *status >= 500,
        TranslationError::Unavailable => false,
        _ => true,
    }
}

/// English name of a target language code, used in prompts. Unknown codes
/// are passed through.
fn language_name(code: &str) -> String {
    let name = match code.trim().to_ascii_lowercase().as_str() {
        "ru" => "Russian",
        "uk" => "Ukrainian",
        "be" => "Belarusian",
        "kk" => "Kazakh",
        "de" => "German",
        "fr" => "French",
        "es" => "Spanish",
        "pt" => "Portuguese",
        "it" => "Italian",
        "pl" => "Polish",
        _ => return code.trim().to_string(),
    };
    name.to_string()
}

fn translation_system_prompt(language: &str) -> String {
    format!(
        "You are an expert translator of poker literature from English into {}.",
        language
    )
}

fn user_prompt(text: &str, purpose: Purpose, language: &str) -> String {
    match purpose {
        Purpose::Translation => format!(
            "Translate the following text into {language}.\n\
             Keep the structure and formatting of the original.\n\
             Keep poker terms in English and give their {language} translation in brackets on first use.\n\
             Keep every paragraph, list and line break.\n\n\
             Original:\n{text}\n\n{language} translation:"
        ),
        Purpose::FigureDescription => format!(
            "Translate the following description of a chart, table or diagram from a poker book into {language}.\n\
             Keep the terminology precise.\n\n\
             Original:\n{text}\n\n{language} translation:"
        ),
        Purpose::TechnicalContent => format!(
            "Translate the following technical text from a poker book into {language}.\n\
             Keep every formula, number and special notation exactly as written.\n\n\
             Original:\n{text}\n\n{language} translation:"
        ),
        Purpose::OcrCorrection => format!(
            "Fix OCR errors and improve the following English text from a poker book.\n\
             IMPORTANT: This is ENGLISH text - do NOT translate it to any other language.\n\
             Fix spelling and formatting. Do not add content that is not in the original.\n\n\
             Original OCR text:\n{text}\n\nImproved English text:"
        ),
    }
}

/// Splits at paragraph boundaries into chunks of roughly `chunk_size`
/// characters. A single oversized paragraph stays whole.
fn split_into_chunks(text: &str, chunk_size: usize) -> Vec<String> {
    if text.chars().count() <= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for paragraph in text.split("\n\n").filter(|p| !p.trim().is_empty()) {
        let projected = current.chars().count() + paragraph.chars().count();
        if projected > chunk_size && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Drops control characters, collapses repeated spaces and removes spaces
/// before closing punctuation.
fn post_process(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
        .collect();
    let collapsed = RE_SPACES.replace_all(&cleaned, " ");
    RE_SPACE_BEFORE_PUNCT
        .replace_all(&collapsed, "$1")
        .trim()
        .to_string()
}
