//! Fixed instruction templates for the completion step.

use std::fmt;
use std::str::FromStr;

use openai_api_rs::v1::chat_completion::{ChatCompletionMessage, Content, MessageRole};

/// Instruction used when the requested mode is not one we know.
pub const FALLBACK_PROMPT: &str = "قم بتنظيم وتنظيف هذا المحتوى.";

const CLEAN_PROMPT: &str = "أنت مساعد متخصص في تحليل وتنظيف وتنسيق محتوى المقالات. قم بتنظيم المحتوى مع اتباع التنسيق التالي:
- استخدم ### للعناوين الرئيسية
- استخدم ## للعناوين الفرعية
- استخدم * للنقاط المهمة
- اترك سطر فارغ بين الفقرات
- قم بتقسيم النص إلى فقرات قصيرة ومفهومة
- ضع الأفكار المهمة في نقاط مرتبة
- قم بإبراز الكلمات المهمة بين علامتي **
- قم بإزالة الإعلانات والمحتوى غير المهم
قم بإعادة صياغة المحتوى بشكل منظم ومفهوم مع الحفاظ على هذا التنسيق.";

const BULLETS_PROMPT: &str = "قم بتحويل هذا المحتوى إلى نقاط منظمة مع اتباع التنسيق التالي:
- استخدم ### للعنوان الرئيسي
- استخدم ## للأقسام الرئيسية
- استخدم * للنقاط الفرعية
- ضع الكلمات المهمة بين علامتي **
- رتب النقاط حسب الأهمية
- اجعل كل نقطة مختصرة ومفيدة";

/// How the extracted text should be reworked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisMode {
    /// Clean up and organize the article.
    #[default]
    Clean,
    /// Summarize to a target number of lines.
    Summarize,
    /// Turn the article into ranked bullet points.
    Bullets,
}

impl AnalysisMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Summarize => "summarize",
            Self::Bullets => "bullets",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clean" => Ok(Self::Clean),
            "summarize" | "summary" => Ok(Self::Summarize),
            "bullets" | "bullet" => Ok(Self::Bullets),
            _ => Err(format!(
                "Invalid mode: {s}. Valid options: clean, summarize, bullets"
            )),
        }
    }
}

/// Target size of a summary. Ignored by the other modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl SummaryLength {
    /// Line-count hint embedded in the summarize template.
    #[must_use]
    pub const fn line_hint(self) -> &'static str {
        match self {
            Self::Short => "3 أسطر",
            Self::Medium => "5-7 أسطر",
            Self::Long => "10-12 سطر",
        }
    }
}

impl FromStr for SummaryLength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(Self::Short),
            "medium" => Ok(Self::Medium),
            "long" => Ok(Self::Long),
            _ => Err(format!(
                "Invalid summary length: {s}. Valid options: short, medium, long"
            )),
        }
    }
}

/// Returns the system instruction for `mode`.
#[must_use]
pub fn select_prompt(mode: AnalysisMode, length: SummaryLength) -> String {
    match mode {
        AnalysisMode::Clean => CLEAN_PROMPT.to_string(),
        AnalysisMode::Summarize => format!(
            "قم بتلخيص هذا المحتوى في {} مع اتباع التنسيق التالي:
- ابدأ بعنوان رئيسي ### يلخص الموضوع
- قسم الملخص إلى نقاط مع علامة *
- اختم بأهم النتائج أو التوصيات
- ضع الكلمات المهمة بين علامتي **
مع الحفاظ على النقاط الأساسية.",
            length.line_hint()
        ),
        AnalysisMode::Bullets => BULLETS_PROMPT.to_string(),
    }
}

/// String-keyed variant of [`select_prompt`].
///
/// Never fails: an unknown mode gets [`FALLBACK_PROMPT`], an unknown length
/// is treated as medium.
#[must_use]
pub fn select_prompt_by_name(mode: &str, length: &str) -> String {
    let Ok(mode) = mode.parse::<AnalysisMode>() else {
        return FALLBACK_PROMPT.to_string();
    };
    let length = length.parse::<SummaryLength>().unwrap_or_default();
    select_prompt(mode, length)
}

/// Builds the two-message chat prompt sent to the completion service.
#[must_use]
pub fn build_messages(instruction: &str, raw_text: &str) -> Vec<ChatCompletionMessage> {
    vec![
        ChatCompletionMessage {
            role: MessageRole::system,
            content: Content::Text(instruction.to_string()),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        },
        ChatCompletionMessage {
            role: MessageRole::user,
            content: Content::Text(raw_text.to_string()),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        },
    ]
}
