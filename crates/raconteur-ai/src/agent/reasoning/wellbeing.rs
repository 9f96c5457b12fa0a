//! Wellbeing / scam guard (§4.7).
//!
//! Entirely new to this workspace — the teacher has no wellbeing/safety
//! concept — but grounded in idiom on `security::policy`'s
//! `IMMUTABLE_SECURITY_POLICY` const-template-string pattern (for the fixed
//! crisis-response strings below) and `security::gate`'s
//! `SecurityDecision`-style decision-record shape, adapted here into
//! [`WellbeingAssessment`]. Pattern tables are `once_cell::sync::Lazy`
//! static data (the teacher's existing `once_cell` dependency), not a
//! rules-engine dependency.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// The fixed 988 Suicide & Crisis Lifeline response text (§8 scenario 2).
pub const CRISIS_LIFELINE_TEXT: &str = "If you are thinking about suicide or are in crisis, please call or text 988 (Suicide & Crisis Lifeline) right now \u{2014} they are available 24/7 and want to help you.";

const MIN_CONFIDENCE: f64 = 0.4;
const RECURRENCE_CAP: usize = 10;
const DEFAULT_RECURRENCE_THRESHOLD: usize = 3;
const ASSESSMENT_LOG_CAP: usize = 100;
const ASSESSMENT_LOG_TRIM_TO: usize = 50;
const SCAM_WARNING_THRESHOLD: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConcernCategory {
    Loneliness,
    Depression,
    SelfHarm,
    SuicidalIdeation,
    CognitiveDecline,
    Disorientation,
    MedicalEmergency,
    SubstanceAbuse,
    Abuse,
    FinancialExploitation,
    FallRisk,
    Distress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScamCategory {
    MoneyRequest,
    GovernmentImpersonation,
    TechSupport,
    Romance,
    Lottery,
    Grandparent,
    Medicare,
    Investment,
    Charity,
    Phishing,
}

/// Emotion signal that can correlate with (and bump the score of) a concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Emotion {
    Loneliness,
    Sadness,
    Fear,
    Confusion,
    Anger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    None,
    Low,
    Moderate,
    High,
    Critical,
}

fn bucket(score: f64) -> Severity {
    if score >= 0.9 {
        Severity::Critical
    } else if score >= 0.7 {
        Severity::High
    } else if score >= 0.5 {
        Severity::Moderate
    } else if score >= 0.3 {
        Severity::Low
    } else {
        Severity::None
    }
}

struct ConcernDef {
    category: ConcernCategory,
    keywords: &'static [&'static str],
    phrases: &'static [&'static str],
    weight: f64,
    critical_overriding: bool,
    emotion_bonus: &'static [(Emotion, f64)],
}

struct ScamDef {
    category: ScamCategory,
    keywords: &'static [&'static str],
    phrases: &'static [&'static str],
    intrinsic_severity: Severity,
}

static CONCERNS: Lazy<Vec<ConcernDef>> = Lazy::new(|| {
    vec![
        ConcernDef {
            category: ConcernCategory::Loneliness,
            keywords: &["lonely", "alone", "isolated", "no one visits", "no friends"],
            phrases: &["nobody calls me anymore", "i have no one to talk to"],
            weight: 1.0,
            critical_overriding: false,
            emotion_bonus: &[(Emotion::Loneliness, 0.3)],
        },
        ConcernDef {
            category: ConcernCategory::Depression,
            keywords: &["hopeless", "worthless", "empty", "can't go on", "sad all the time"],
            phrases: &["i don't see the point anymore", "nothing matters to me"],
            weight: 1.0,
            critical_overriding: false,
            emotion_bonus: &[(Emotion::Sadness, 0.2)],
        },
        ConcernDef {
            category: ConcernCategory::SelfHarm,
            keywords: &["hurt myself", "cutting", "self-harm", "harm myself"],
            phrases: &["i want to hurt myself", "i've been cutting myself"],
            weight: 1.2,
            critical_overriding: true,
            emotion_bonus: &[],
        },
        ConcernDef {
            category: ConcernCategory::SuicidalIdeation,
            keywords: &["suicide", "suicidal", "kill myself", "end it all", "not worth living"],
            phrases: &["i don't want to live anymore", "i want to end my life"],
            weight: 1.2,
            critical_overriding: true,
            emotion_bonus: &[(Emotion::Sadness, 0.1)],
        },
        ConcernDef {
            category: ConcernCategory::CognitiveDecline,
            keywords: &["forget", "forgetful", "memory loss", "can't remember"],
            phrases: &["i keep forgetting where i put things", "i can't remember names anymore"],
            weight: 1.0,
            critical_overriding: false,
            emotion_bonus: &[(Emotion::Confusion, 0.2)],
        },
        ConcernDef {
            category: ConcernCategory::Disorientation,
            keywords: &["confused", "lost", "disoriented", "don't know where i am"],
            phrases: &["i don't know where i am right now", "i got lost on my way home"],
            weight: 1.0,
            critical_overriding: false,
            emotion_bonus: &[(Emotion::Confusion, 0.3)],
        },
        ConcernDef {
            category: ConcernCategory::MedicalEmergency,
            keywords: &["chest pain", "can't breathe", "stroke", "heart attack", "bleeding"],
            phrases: &["i think i'm having a heart attack", "i can't breathe right now"],
            weight: 1.2,
            critical_overriding: true,
            emotion_bonus: &[(Emotion::Fear, 0.2)],
        },
        ConcernDef {
            category: ConcernCategory::SubstanceAbuse,
            keywords: &["too many pills", "drinking too much", "overdose", "mixing medications"],
            phrases: &["i took too many pills", "i've been drinking more than usual"],
            weight: 1.0,
            critical_overriding: false,
            emotion_bonus: &[],
        },
        ConcernDef {
            category: ConcernCategory::Abuse,
            keywords: &["hitting me", "threatens me", "takes my money", "won't let me leave"],
            phrases: &["someone at home is hurting me", "he won't let me call for help"],
            weight: 1.2,
            critical_overriding: true,
            emotion_bonus: &[(Emotion::Fear, 0.3)],
        },
        ConcernDef {
            category: ConcernCategory::FinancialExploitation,
            keywords: &["took my money", "stole from me", "emptied my account"],
            phrases: &["someone took money from my account", "my caregiver is taking my money"],
            weight: 1.0,
            critical_overriding: false,
            emotion_bonus: &[],
        },
        ConcernDef {
            category: ConcernCategory::FallRisk,
            keywords: &["fell down", "fell again", "dizzy", "lost my balance"],
            phrases: &["i fell down again this week", "i get dizzy when i stand up"],
            weight: 1.0,
            critical_overriding: false,
            emotion_bonus: &[],
        },
        ConcernDef {
            category: ConcernCategory::Distress,
            keywords: &["overwhelmed", "can't cope", "panicking", "so stressed"],
            phrases: &["i can't cope with this anymore", "i am so overwhelmed right now"],
            weight: 0.8,
            critical_overriding: false,
            emotion_bonus: &[(Emotion::Fear, 0.1)],
        },
    ]
});

static SCAMS: Lazy<Vec<ScamDef>> = Lazy::new(|| {
    vec![
        ScamDef {
            category: ScamCategory::MoneyRequest,
            keywords: &["wire money", "send money", "gift cards", "western union"],
            phrases: &["they asked me to send money right away"],
            intrinsic_severity: Severity::High,
        },
        ScamDef {
            category: ScamCategory::GovernmentImpersonation,
            keywords: &["irs", "social security office", "arrest warrant", "social security number"],
            phrases: &["someone from the irs called about a warrant"],
            intrinsic_severity: Severity::High,
        },
        ScamDef {
            category: ScamCategory::TechSupport,
            keywords: &["remote access", "computer virus", "microsoft support", "geek squad"],
            phrases: &["a tech support agent asked for remote access to my computer"],
            intrinsic_severity: Severity::Moderate,
        },
        ScamDef {
            category: ScamCategory::Romance,
            keywords: &["online boyfriend", "online girlfriend", "met online", "never met in person"],
            phrases: &["my online boyfriend needs money to visit me"],
            intrinsic_severity: Severity::Moderate,
        },
        ScamDef {
            category: ScamCategory::Lottery,
            keywords: &["you won", "lottery", "sweepstakes", "claim your prize"],
            phrases: &["i won a lottery i never entered"],
            intrinsic_severity: Severity::Moderate,
        },
        ScamDef {
            category: ScamCategory::Grandparent,
            keywords: &["grandchild", "bail money", "in jail", "grandson needs"],
            phrases: &["someone called saying my grandchild needs bail money", "my grandson is in jail and needs money"],
            intrinsic_severity: Severity::Critical,
        },
        ScamDef {
            category: ScamCategory::Medicare,
            keywords: &["medicare card", "medicare number", "free medical equipment"],
            phrases: &["someone called asking to verify my medicare number"],
            intrinsic_severity: Severity::Moderate,
        },
        ScamDef {
            category: ScamCategory::Investment,
            keywords: &["guaranteed returns", "crypto investment", "double your money"],
            phrases: &["they promised to double my money in a week"],
            intrinsic_severity: Severity::High,
        },
        ScamDef {
            category: ScamCategory::Charity,
            keywords: &["donate now", "charity drive", "disaster relief fund"],
            phrases: &["a caller wants a donation for disaster relief right now"],
            intrinsic_severity: Severity::Low,
        },
        ScamDef {
            category: ScamCategory::Phishing,
            keywords: &["verify your account", "click this link", "suspended account", "confirm your password"],
            phrases: &["an email says my account will be suspended unless i click a link"],
            intrinsic_severity: Severity::Moderate,
        },
    ]
});

/// Known medical-misinformation substrings gating the disclaimer append.
const MEDICAL_MISINFO_SUBSTRINGS: &[&str] = &[
    "vaccines cause autism",
    "stop taking your medication",
    "bleach cures",
    "cancer can be cured by",
];

const MEDICAL_DISCLAIMER: &str = "This may not be accurate medical information. Please check with your doctor or pharmacist before making any changes to your care.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedConcern {
    pub category: ConcernCategory,
    pub score: f64,
    pub severity: Severity,
    pub evidence: Vec<String>,
    pub recurring: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedScam {
    pub category: ScamCategory,
    pub score: f64,
    pub severity: Severity,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseType {
    Emergency,
    Escalate,
    SuggestContact,
    EncourageHelp,
    Comfort,
    Supportive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Log,
    CallEmergency,
    NotifyCaregiver,
    NotifyFamily,
    RecommendProfessional,
    ScheduleFollowup,
    ProvideResources,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedAction {
    pub kind: ActionKind,
    pub priority: u8,
    pub requires_consent: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WellbeingAssessment {
    pub overall_severity: Severity,
    pub concerns: Vec<DetectedConcern>,
    pub requires_immediate_action: bool,
    pub response_type: ResponseType,
    pub suggested_response: String,
    pub recommended_actions: Vec<RecommendedAction>,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub justification: String,
}

fn score_keywords_and_phrases(lower_input: &str, keywords: &[&str], phrases: &[&str]) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut evidence = Vec::new();
    for kw in keywords {
        if lower_input.contains(kw) {
            score += 0.3;
            evidence.push((*kw).to_string());
        }
    }
    for phrase in phrases {
        if lower_input.contains(phrase) {
            score += 0.5;
            evidence.push((*phrase).to_string());
        }
    }
    (score, evidence)
}

/// Recurrence tracker: per-concern timestamp list capped at 10 entries;
/// marked recurring once `len >= recurrence_threshold`.
pub struct RecurrenceTracker {
    threshold: usize,
    timestamps: Mutex<HashMap<ConcernCategory, VecDeque<DateTime<Utc>>>>,
}

impl Default for RecurrenceTracker {
    fn default() -> Self {
        Self::new(DEFAULT_RECURRENCE_THRESHOLD)
    }
}

impl RecurrenceTracker {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            timestamps: Mutex::new(HashMap::new()),
        }
    }

    fn record_and_check(&self, category: ConcernCategory, now: DateTime<Utc>) -> bool {
        let mut map = self.timestamps.lock();
        let entries = map.entry(category).or_default();
        entries.push_back(now);
        while entries.len() > RECURRENCE_CAP {
            entries.pop_front();
        }
        entries.len() >= self.threshold
    }
}

/// Pattern-matching wellbeing guard with assessment history and recurrence
/// tracking.
pub struct WellbeingGuard {
    recurrence: RecurrenceTracker,
    assessment_log: Mutex<VecDeque<WellbeingAssessment>>,
    min_confidence: f64,
}

impl Default for WellbeingGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl WellbeingGuard {
    pub fn new() -> Self {
        Self {
            recurrence: RecurrenceTracker::default(),
            assessment_log: Mutex::new(VecDeque::new()),
            min_confidence: MIN_CONFIDENCE,
        }
    }

    pub fn with_recurrence_threshold(mut self, threshold: usize) -> Self {
        self.recurrence = RecurrenceTracker::new(threshold);
        self
    }

    /// Assess `input` for wellbeing concerns, optionally informed by
    /// detected emotions.
    pub fn assess(&self, input: &str, emotions: &[Emotion]) -> WellbeingAssessment {
        let lower = input.to_lowercase();
        let now = Utc::now();
        let mut concerns = Vec::new();

        for def in CONCERNS.iter() {
            let (mut score, evidence) = score_keywords_and_phrases(&lower, def.keywords, def.phrases);
            score *= def.weight;
            for (emotion, bonus) in def.emotion_bonus {
                if emotions.contains(emotion) {
                    score += bonus;
                }
            }
            if evidence.is_empty() || score < self.min_confidence {
                continue;
            }
            let recurring = self.recurrence.record_and_check(def.category, now);
            concerns.push(DetectedConcern {
                category: def.category,
                score,
                severity: bucket(score),
                evidence,
                recurring,
            });
        }

        let any_critical_overriding = CONCERNS
            .iter()
            .filter(|d| d.critical_overriding)
            .any(|d| concerns.iter().any(|c| c.category == d.category));

        let overall_severity = if any_critical_overriding {
            Severity::Critical
        } else {
            concerns
                .iter()
                .map(|c| c.severity)
                .max()
                .unwrap_or(Severity::None)
        };

        let has_suicidal_or_medical = concerns.iter().any(|c| {
            matches!(
                c.category,
                ConcernCategory::SuicidalIdeation | ConcernCategory::MedicalEmergency
            )
        });

        let response_type = match overall_severity {
            Severity::Critical if has_suicidal_or_medical => ResponseType::Emergency,
            Severity::Critical => ResponseType::Escalate,
            Severity::High => ResponseType::SuggestContact,
            Severity::Moderate => ResponseType::EncourageHelp,
            Severity::Low => ResponseType::Comfort,
            Severity::None => ResponseType::Supportive,
        };

        let suggested_response = suggested_response_for(response_type, &concerns);
        let recommended_actions = recommended_actions_for(overall_severity);
        let confidence = concerns
            .iter()
            .map(|c| c.score)
            .fold(0.0_f64, f64::max)
            .min(1.0);

        let assessment = WellbeingAssessment {
            overall_severity,
            requires_immediate_action: matches!(overall_severity, Severity::Critical | Severity::High),
            response_type,
            suggested_response,
            recommended_actions,
            confidence,
            timestamp: now,
            justification: justification_for(&concerns),
            concerns,
        };

        self.log_assessment(assessment.clone());
        assessment
    }

    fn log_assessment(&self, assessment: WellbeingAssessment) {
        let mut log = self.assessment_log.lock();
        log.push_back(assessment);
        if log.len() >= ASSESSMENT_LOG_CAP {
            while log.len() > ASSESSMENT_LOG_TRIM_TO {
                log.pop_front();
            }
        }
    }

    pub fn assessment_log_len(&self) -> usize {
        self.assessment_log.lock().len()
    }

    /// Empathy adaptation (§4.2 Synthesis): when the run's wellbeing
    /// concerns reached at least moderate severity, prefix the synthesized
    /// answer with a brief acknowledgment before the substantive reply.
    pub fn adapt_with_empathy(&self, answer: &str, assessment: &WellbeingAssessment) -> String {
        if assessment.overall_severity >= Severity::Moderate && !assessment.concerns.is_empty() {
            format!("I hear that this is on your mind. {answer}")
        } else {
            answer.to_string()
        }
    }

    /// Explanation adjunct (§4.2 Synthesis): for cognitive-decline or
    /// disorientation concerns, append a short plain-language recap so the
    /// answer doesn't rely on the reader holding the whole thing in mind.
    pub fn add_explanation_adjunct(&self, answer: &str, assessment: &WellbeingAssessment) -> String {
        if !Self::needs_cognitive_support(assessment) {
            return answer.to_string();
        }
        let recap = answer.split('.').next().unwrap_or(answer).trim();
        if recap.is_empty() || recap == answer.trim_end_matches('.') {
            answer.to_string()
        } else {
            format!("{answer}\n\nIn short: {recap}.")
        }
    }

    /// Cognitive adaptation (§4.2 Synthesis): for the same concerns, break
    /// a long run-on answer into one sentence per line so it's easier to
    /// follow one thought at a time.
    pub fn adapt_for_cognition(&self, answer: &str, assessment: &WellbeingAssessment) -> String {
        if !Self::needs_cognitive_support(assessment) || answer.len() <= 240 {
            return answer.to_string();
        }
        answer
            .split(". ")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| if s.ends_with('.') { s.to_string() } else { format!("{s}.") })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn needs_cognitive_support(assessment: &WellbeingAssessment) -> bool {
        assessment
            .concerns
            .iter()
            .any(|c| matches!(c.category, ConcernCategory::CognitiveDecline | ConcernCategory::Disorientation))
    }

    /// Scam detection: same scoring shape, fixed 0.4 threshold triggers a
    /// warning. Appends the fixed medical-misinformation disclaimer when a
    /// known substring is present.
    pub fn detect_scam(&self, input: &str) -> Option<DetectedScam> {
        let lower = input.to_lowercase();
        let mut best: Option<DetectedScam> = None;
        for def in SCAMS.iter() {
            let (score, evidence) = score_keywords_and_phrases(&lower, def.keywords, def.phrases);
            if evidence.is_empty() || score < SCAM_WARNING_THRESHOLD {
                continue;
            }
            let severity = if score >= 0.9 {
                def.intrinsic_severity
            } else {
                bucket(score).max(def.intrinsic_severity).min(def.intrinsic_severity)
            };
            let candidate = DetectedScam {
                category: def.category,
                score,
                severity: def.intrinsic_severity.max(severity),
                evidence,
            };
            match &best {
                Some(b) if b.score >= candidate.score => {}
                _ => best = Some(candidate),
            }
        }
        best
    }

    pub fn scam_response(&self, scam: &DetectedScam) -> String {
        let mut response = match scam.category {
            ScamCategory::Grandparent => {
                "This sounds like the 'grandparent scam.' Please do not send any money or gift cards. Hang up and call your grandchild directly using a number you already know, or ask a family member to verify before doing anything.".to_string()
            }
            ScamCategory::GovernmentImpersonation => {
                "Real government agencies do not call demanding immediate payment or your Social Security number. Please do not send money or share personal information. Hang up and contact the agency directly using a number from their official website.".to_string()
            }
            ScamCategory::TechSupport => {
                "Please do not give remote access to your computer to anyone who called you unexpectedly. Hang up and contact a trusted family member or the company directly.".to_string()
            }
            _ => format!(
                "This message has signs of a {:?} scam. Please do not send money, gift cards, or personal information until you've verified this with a trusted family member.",
                scam.category
            ),
        };
        if contains_medical_misinfo(&response) {
            response.push(' ');
            response.push_str(MEDICAL_DISCLAIMER);
        }
        response
    }
}

fn justification_for(concerns: &[DetectedConcern]) -> String {
    if concerns.is_empty() {
        return "no concerning patterns detected".to_string();
    }
    let categories: Vec<String> = concerns.iter().map(|c| format!("{:?}", c.category)).collect();
    format!("detected concern(s): {}", categories.join(", "))
}

fn suggested_response_for(response_type: ResponseType, concerns: &[DetectedConcern]) -> String {
    let has_suicidal = concerns
        .iter()
        .any(|c| c.category == ConcernCategory::SuicidalIdeation);
    let has_medical = concerns
        .iter()
        .any(|c| c.category == ConcernCategory::MedicalEmergency);

    match response_type {
        ResponseType::Emergency if has_suicidal => {
            format!("{CRISIS_LIFELINE_TEXT} You are not alone, and I'm glad you told me. I'm also going to let someone who can help know right away.")
        }
        ResponseType::Emergency if has_medical => {
            "This sounds like it could be a medical emergency. Please call 911 or your local emergency number right now, or ask someone nearby to call for you.".to_string()
        }
        ResponseType::Emergency => {
            format!("{CRISIS_LIFELINE_TEXT} I'm concerned about your safety and want to make sure you get help right away.")
        }
        ResponseType::Escalate => {
            "I'm concerned about what you've shared. I'd like to let a trusted person know so they can check in with you.".to_string()
        }
        ResponseType::SuggestContact => {
            "It might help to talk this through with someone you trust, like a family member or your doctor. Would you like me to help you reach out to them?".to_string()
        }
        ResponseType::EncourageHelp => {
            "It sounds like things have been difficult. Talking to someone you trust, or your doctor, could really help.".to_string()
        }
        ResponseType::Comfort => {
            "I hear you, and I'm here to listen. Thank you for sharing that with me.".to_string()
        }
        ResponseType::Supportive => "I'm here for you, tell me more whenever you're ready.".to_string(),
    }
}

fn recommended_actions_for(severity: Severity) -> Vec<RecommendedAction> {
    let mut actions = vec![RecommendedAction {
        kind: ActionKind::Log,
        priority: 3,
        requires_consent: false,
    }];

    match severity {
        Severity::Critical => {
            actions.push(RecommendedAction {
                kind: ActionKind::CallEmergency,
                priority: 1,
                requires_consent: false,
            });
            actions.push(RecommendedAction {
                kind: ActionKind::NotifyCaregiver,
                priority: 1,
                requires_consent: false,
            });
        }
        Severity::High => {
            actions.push(RecommendedAction {
                kind: ActionKind::NotifyFamily,
                priority: 2,
                requires_consent: true,
            });
            actions.push(RecommendedAction {
                kind: ActionKind::RecommendProfessional,
                priority: 2,
                requires_consent: false,
            });
        }
        Severity::Moderate => {
            actions.push(RecommendedAction {
                kind: ActionKind::ScheduleFollowup,
                priority: 3,
                requires_consent: false,
            });
            actions.push(RecommendedAction {
                kind: ActionKind::ProvideResources,
                priority: 3,
                requires_consent: false,
            });
        }
        Severity::Low | Severity::None => {}
    }

    actions.sort_by_key(|a| a.priority);
    actions
}

fn contains_medical_misinfo(text: &str) -> bool {
    let lower = text.to_lowercase();
    MEDICAL_MISINFO_SUBSTRINGS.iter().any(|s| lower.contains(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suicidal_ideation_is_critical_with_988_text() {
        let guard = WellbeingGuard::new();
        let assessment = guard.assess("I don't want to live anymore.", &[]);
        assert_eq!(assessment.overall_severity, Severity::Critical);
        assert_eq!(assessment.response_type, ResponseType::Emergency);
        assert!(assessment.suggested_response.contains("988"));
        let priorities: Vec<_> = assessment
            .recommended_actions
            .iter()
            .filter(|a| matches!(a.kind, ActionKind::CallEmergency | ActionKind::NotifyCaregiver))
            .map(|a| a.priority)
            .collect();
        assert_eq!(priorities, vec![1, 1]);
    }

    #[test]
    fn critical_overriding_concern_wins_regardless_of_score() {
        let guard = WellbeingGuard::new();
        // A single weak keyword hit: score is low (0.3 * weight), but
        // self-harm is critical-overriding so overall severity must still
        // be CRITICAL per the invariant in §8.
        let assessment = guard.assess("sometimes thoughts about cutting cross my mind", &[]);
        assert!(assessment.concerns.iter().any(|c| c.category == ConcernCategory::SelfHarm));
        assert_eq!(assessment.overall_severity, Severity::Critical);
    }

    #[test]
    fn loneliness_emotion_bonus_raises_score() {
        let guard = WellbeingGuard::new();
        let without = guard.assess("i feel so lonely lately", &[]);
        let with = guard.assess("i feel so lonely lately", &[Emotion::Loneliness]);
        let score_without = without.concerns[0].score;
        let score_with = with.concerns[0].score;
        assert!(score_with > score_without);
    }

    #[test]
    fn recurrence_marks_after_threshold() {
        let guard = WellbeingGuard::new();
        for _ in 0..2 {
            let a = guard.assess("i feel so lonely and isolated", &[]);
            assert!(!a.concerns[0].recurring);
        }
        let third = guard.assess("i feel so lonely and isolated", &[]);
        assert!(third.concerns[0].recurring);
    }

    #[test]
    fn grandparent_scam_is_critical_and_warns_against_sending_money() {
        let guard = WellbeingGuard::new();
        let scam = guard
            .detect_scam("someone called saying my grandchild needs bail money")
            .expect("grandparent scam should be detected");
        assert_eq!(scam.category, ScamCategory::Grandparent);
        assert_eq!(scam.severity, Severity::Critical);
        let response = guard.scam_response(&scam);
        assert!(response.to_lowercase().contains("do not send"));
    }

    #[test]
    fn assessment_log_trims_on_overflow() {
        let guard = WellbeingGuard::new();
        for _ in 0..ASSESSMENT_LOG_CAP + 5 {
            guard.assess("just saying hello", &[]);
        }
        assert!(guard.assessment_log_len() <= ASSESSMENT_LOG_TRIM_TO + 5);
    }

    #[test]
    fn neutral_input_yields_no_concerns() {
        let guard = WellbeingGuard::new();
        let assessment = guard.assess("what's the weather like today?", &[]);
        assert!(assessment.concerns.is_empty());
        assert_eq!(assessment.overall_severity, Severity::None);
        assert_eq!(assessment.response_type, ResponseType::Supportive);
    }

    #[test]
    fn empathy_adaptation_prefixes_moderate_or_worse_concerns() {
        let guard = WellbeingGuard::new();
        let assessment = guard.assess("i feel so lonely and isolated every single day", &[]);
        let adapted = guard.adapt_with_empathy("Here's an idea for today.", &assessment);
        assert!(adapted.starts_with("I hear that"));
    }

    #[test]
    fn cognitive_adaptations_only_apply_to_cognitive_concerns() {
        let guard = WellbeingGuard::new();
        let cognitive = guard.assess("i keep forgetting where i put things these days", &[]);
        let neutral = guard.assess("what's the weather like today?", &[]);
        let long_answer = "First we'll plan the visit. Then we'll pack a small bag. Finally we'll call ahead so they know when to expect you.";

        let adjunct = guard.add_explanation_adjunct(long_answer, &cognitive);
        assert!(adjunct.contains("In short:"));
        assert_eq!(guard.add_explanation_adjunct(long_answer, &neutral), long_answer);

        let adapted = guard.adapt_for_cognition(long_answer, &cognitive);
        assert!(adapted.lines().count() > 1);
        assert_eq!(guard.adapt_for_cognition(long_answer, &neutral), long_answer);
    }
}
