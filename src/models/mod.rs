//! Data model shared by every pipeline stage.
//!
//! Stage results that come back from the LLM carry a `degraded` flag. It is
//! never read from model output; only the fallback constructors set it.


use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

/// Reason recorded on the moderation fallback.
pub const MODERATION_FALLBACK_REASON: &str = "llm call or parsing failed";
/// Single detail line recorded on the moderation fallback.
pub const MODERATION_FALLBACK_DETAIL: &str = "system error during moderation check.";
/// Assessment recorded on the mediation fallback.
pub const MEDIATION_FALLBACK_ASSESSMENT: &str = "error: llm call or parsing failed for mediation";
/// Assessment recorded on the education fallback.
pub const EDUCATION_FALLBACK_ASSESSMENT: &str = "error: llm call or parsing failed for education";
/// Decision text of the critical orchestrator fallback.
pub const CRITICAL_FALLBACK_DECISION: &str =
    "error: critical processing failure (analysis/moderation missing)";
/// Notification sent to the user by the critical orchestrator fallback.
pub const CRITICAL_FALLBACK_NOTIFICATION: &str =
    "your message requires manual review due to an internal processing issue.";

// ============================================================================
// Message
// ============================================================================

/// Who sent a message and how it is identified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContext {
    /// Player identifier.
    #[serde(alias = "id")]
    pub user_id: String,
    /// Display name of the sender.
    pub username: String,
    /// Unique message identifier.
    pub message_id: String,
}

/// A chat message under moderation. Never modified once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Raw message text.
    pub content: String,
    /// Sender and identifiers.
    pub context: MessageContext,
}

impl Message {
    /// Create a message from its text and identifiers
    pub fn new(
        content: impl Into<String>,
        user_id: impl Into<String>,
        username: impl Into<String>,
        message_id: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            context: MessageContext {
                user_id: user_id.into(),
                username: username.into(),
                message_id: message_id.into(),
            },
        }
    }

    /// The message identifier
    pub fn id(&self) -> &str {
        &self.context.message_id
    }
}

// ============================================================================
// Analysis
// ============================================================================

/// Closed label set emitted by the content-category classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentCategory {
    /// No issues detected.
    Ok,
    /// Sexual content.
    Sexual,
    /// Hate speech.
    Hate,
    /// Violence.
    Violence,
    /// Harassment.
    Harassment,
    /// Self-harm.
    SelfHarm,
    /// Sexual content involving minors.
    SexualMinors,
    /// Threatening hate speech.
    HateThreatening,
    /// Graphic violence.
    ViolenceGraphic,
}

impl ContentCategory {
    /// Every recognized label, in classifier order.
    pub const ALL: [ContentCategory; 9] = [
        ContentCategory::Ok,
        ContentCategory::Sexual,
        ContentCategory::Hate,
        ContentCategory::Violence,
        ContentCategory::Harassment,
        ContentCategory::SelfHarm,
        ContentCategory::SexualMinors,
        ContentCategory::HateThreatening,
        ContentCategory::ViolenceGraphic,
    ];

    /// The classifier's wire label
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCategory::Ok => "OK",
            ContentCategory::Sexual => "S",
            ContentCategory::Hate => "H",
            ContentCategory::Violence => "V",
            ContentCategory::Harassment => "HR",
            ContentCategory::SelfHarm => "SH",
            ContentCategory::SexualMinors => "S3",
            ContentCategory::HateThreatening => "H2",
            ContentCategory::ViolenceGraphic => "V2",
        }
    }

    /// Whether this label marks harmful content
    pub fn is_harmful(&self) -> bool {
        !matches!(self, ContentCategory::Ok)
    }
}

impl std::fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ContentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown content category: {}", s))
    }
}

impl Serialize for ContentCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ContentCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Output of the Analyze stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Sentiment score in `[-100, 100]`.
    pub sentiment: i32,
    /// Recognized categories with probabilities, highest first. Never empty.
    pub categories: Vec<(ContentCategory, f64)>,
}

impl AnalysisResult {
    /// Neutral sentiment and a certain OK category.
    pub fn neutral() -> Self {
        Self {
            sentiment: 0,
            categories: vec![(ContentCategory::Ok, 1.0)],
        }
    }

    /// Highest-probability category
    pub fn top_category(&self) -> ContentCategory {
        self.categories
            .first()
            .map(|(c, _)| *c)
            .unwrap_or(ContentCategory::Ok)
    }

    /// Probability recorded for a category, 0.0 when absent
    pub fn probability(&self, category: ContentCategory) -> f64 {
        self.categories
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, p)| *p)
            .unwrap_or(0.0)
    }

    /// Emotion bucket for the sentiment score
    pub fn emotion(&self) -> Emotion {
        Emotion::from_score(self.sentiment)
    }
}

/// Coarse emotion bucket derived from a sentiment score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emotion {
    /// Score above 70.
    VeryPositive,
    /// Score above 30.
    Positive,
    /// Score from -30 to 30.
    Neutral,
    /// Score from -70 to -31.
    Negative,
    /// Score below -70.
    VeryNegative,
}

impl Emotion {
    /// Bucket a score in `[-100, 100]`
    pub fn from_score(score: i32) -> Self {
        if score > 70 {
            Emotion::VeryPositive
        } else if score > 30 {
            Emotion::Positive
        } else if score >= -30 {
            Emotion::Neutral
        } else if score >= -70 {
            Emotion::Negative
        } else {
            Emotion::VeryNegative
        }
    }

    /// Human-readable label
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::VeryPositive => "Very Positive",
            Emotion::Positive => "Positive",
            Emotion::Neutral => "Neutral",
            Emotion::Negative => "Negative",
            Emotion::VeryNegative => "Very Negative",
        }
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Moderation
// ============================================================================

/// Moderation verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationDecision {
    /// Publish as is.
    Approve,
    /// Publish pending human review.
    Flag,
    /// Do not publish.
    Block,
}

impl ModerationDecision {
    /// Wire value
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationDecision::Approve => "approve",
            ModerationDecision::Flag => "flag",
            ModerationDecision::Block => "block",
        }
    }
}

impl std::fmt::Display for ModerationDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ModerationDecision {
    type Err = String;

    /// Accepts the imperative and past-tense forms, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "approve" | "approved" => Ok(ModerationDecision::Approve),
            "flag" | "flagged" => Ok(ModerationDecision::Flag),
            "block" | "blocked" => Ok(ModerationDecision::Block),
            _ => Err(format!("Unknown moderation decision: {}", s)),
        }
    }
}

impl Serialize for ModerationDecision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ModerationDecision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Output of the Moderate stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationResult {
    /// The verdict.
    pub decision: ModerationDecision,
    /// Short justification.
    pub reason: String,
    /// Observations; a bare string from the model becomes a one-item list.
    #[serde(default, deserialize_with = "string_or_list")]
    pub details: Vec<String>,
    /// Set only on the fallback value.
    #[serde(default, skip_deserializing)]
    pub degraded: bool,
}

impl ModerationResult {
    /// Fixed value used when the LLM call, parse or validation fails.
    pub fn fallback() -> Self {
        Self {
            decision: ModerationDecision::Flag,
            reason: MODERATION_FALLBACK_REASON.to_string(),
            details: vec![MODERATION_FALLBACK_DETAIL.to_string()],
            degraded: true,
        }
    }

    /// A genuine, LLM-derived approval.
    pub fn is_clean_approve(&self) -> bool {
        self.decision == ModerationDecision::Approve && !self.degraded
    }
}

fn string_or_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Null(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
        OneOrMany::Null(()) => Vec::new(),
    })
}

// ============================================================================
// Mediation & Education
// ============================================================================

/// One conflict-resolution suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStrategy {
    /// Strategy name.
    pub title: String,
    /// How it helps.
    pub description: String,
    /// What to say or do.
    pub example: String,
}

/// Output of the Mediate stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediationResult {
    /// Read on the conflict.
    pub assessment: String,
    /// Suggested strategies.
    pub strategies: Vec<ResolutionStrategy>,
    /// Set only on the fallback value.
    #[serde(default, skip_deserializing)]
    pub degraded: bool,
}

impl MediationResult {
    /// Fixed value used when the LLM call, parse or validation fails.
    pub fn fallback() -> Self {
        Self {
            assessment: MEDIATION_FALLBACK_ASSESSMENT.to_string(),
            strategies: Vec::new(),
            degraded: true,
        }
    }
}

/// One recommended learning resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationalResource {
    /// Resource name.
    pub title: String,
    /// What it teaches.
    pub description: String,
    /// Where to find it.
    pub url: String,
}

/// Output of the Educate stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationResult {
    /// The learning opportunity.
    pub assessment: String,
    /// Recommended resources.
    pub resources: Vec<EducationalResource>,
    /// Set only on the fallback value.
    #[serde(default, skip_deserializing)]
    pub degraded: bool,
}

impl EducationResult {
    /// Fixed value used when the LLM call, parse or validation fails.
    pub fn fallback() -> Self {
        Self {
            assessment: EDUCATION_FALLBACK_ASSESSMENT.to_string(),
            resources: Vec::new(),
            degraded: true,
        }
    }
}

// ============================================================================
// Final action
// ============================================================================

/// Closed vocabulary of enforcement actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Approve message for public display.
    ApproveMessage,
    /// Hide message from public view pending review.
    HideMessage,
    /// Block message from being displayed.
    BlockMessage,
    /// Award positive communication points to user.
    AwardPoints,
    /// Notify user of guideline violation.
    NotifyUser,
    /// Queue for human moderator review.
    QueueForReview,
    /// Restrict chat privileges temporarily.
    RestrictChat,
    /// Require completion of community standards course.
    RequireCourse,
}

impl ActionKind {
    /// Every action, in the order offered to the model.
    pub const ALL: [ActionKind; 8] = [
        ActionKind::ApproveMessage,
        ActionKind::HideMessage,
        ActionKind::BlockMessage,
        ActionKind::AwardPoints,
        ActionKind::NotifyUser,
        ActionKind::QueueForReview,
        ActionKind::RestrictChat,
        ActionKind::RequireCourse,
    ];

    /// The action phrase used in prompts and output
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::ApproveMessage => "approve message for public display",
            ActionKind::HideMessage => "hide message from public view pending review",
            ActionKind::BlockMessage => "block message from being displayed",
            ActionKind::AwardPoints => "award positive communication points to user",
            ActionKind::NotifyUser => "notify user of guideline violation",
            ActionKind::QueueForReview => "queue for human moderator review",
            ActionKind::RestrictChat => "restrict chat privileges temporarily",
            ActionKind::RequireCourse => "require completion of community standards course",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().trim_end_matches('.').to_lowercase();
        ActionKind::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == normalized)
            .ok_or_else(|| format!("Unknown action: {}", s))
    }
}

impl Serialize for ActionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActionKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The pipeline's terminal output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFinalAction")]
pub struct FinalAction {
    /// Short description of the final decision.
    pub decision: String,
    /// Actions to take, deduplicated, in model order.
    pub actions: Vec<ActionKind>,
    /// Text shown to the sender, if any.
    pub notification: Option<String>,
    /// Set only on fallback values.
    pub degraded: bool,
}

/// Final action as the model writes it, before vocabulary checks.
#[derive(Debug, Deserialize)]
struct RawFinalAction {
    decision: String,
    actions: Vec<String>,
    #[serde(default)]
    notification: Option<String>,
}

impl TryFrom<RawFinalAction> for FinalAction {
    type Error = String;

    fn try_from(raw: RawFinalAction) -> Result<Self, Self::Error> {
        let mut actions = Vec::with_capacity(raw.actions.len());
        for action in &raw.actions {
            match action.parse::<ActionKind>() {
                Ok(kind) if !actions.contains(&kind) => actions.push(kind),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Dropping unrecognized final action"),
            }
        }

        if actions.is_empty() {
            return Err(format!(
                "no recognized actions among {} proposed",
                raw.actions.len()
            ));
        }

        Ok(Self {
            decision: raw.decision,
            actions,
            notification: raw.notification.filter(|n| !n.trim().is_empty()),
            degraded: false,
        })
    }
}

impl FinalAction {
    /// Used when analysis or moderation is missing from the state.
    pub fn critical_fallback() -> Self {
        Self {
            decision: CRITICAL_FALLBACK_DECISION.to_string(),
            actions: vec![ActionKind::QueueForReview],
            notification: Some(CRITICAL_FALLBACK_NOTIFICATION.to_string()),
            degraded: true,
        }
    }

    /// Used when the orchestrator's own LLM call or parse fails.
    pub fn orchestration_fallback(suggested: ModerationDecision) -> Self {
        Self {
            decision: format!("flagged due to orchestration error ({} suggested)", suggested),
            actions: vec![ActionKind::QueueForReview],
            notification: None,
            degraded: true,
        }
    }

    /// Whether the plan routes the message to a human
    pub fn requires_review(&self) -> bool {
        self.actions.contains(&ActionKind::QueueForReview)
    }
}
