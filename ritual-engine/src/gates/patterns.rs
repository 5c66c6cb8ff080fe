//! Keyword and regex classification shared by the gates.
//!
//! Everything here is stateless and works on normalized text (lowercase,
//! accents folded, whitespace collapsed) unless a function says otherwise.
//! English and French lexicons are matched together; an intent mixing both
//! languages is common enough that splitting by locale loses hits.

use once_cell::sync::Lazy;
use regex::Regex;

pub use playbook::text::normalize;

static ACTION_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\b(?:",
        // English
        r"learn\w*|improv\w*|practi[cs]\w*|read(?:s|ing)?|writ(?:e|es|ing)|run(?:s|ning)?|",
        r"cook\w*|bak(?:e|es|ing)|play(?:s|ing)?|stud(?:y|ies|ying)|build\w*|creat(?:e|es|ing)|",
        r"draw(?:s|ing)?|paint\w*|sing(?:s|ing)?|speak\w*|train\w*|understand\w*|start\w*|",
        r"finish\w*|los(?:e|es|ing)|gain\w*|prepar\w*|memori[sz]\w*|meditat\w*|walk\w*|swim\w*|",
        r"cod(?:e|es|ing)|program\w*|develop\w*|mak(?:e|es|ing)|complet(?:e|es|ing)|review\w*|",
        r"discover\w*|explor\w*|master\w*|becom\w*|get(?:s|ting)?|work(?:s|ing)?|fix\w*|knit\w*|",
        r"sew(?:s|ing)?|lift\w*|stretch\w*|",
        // French (accent-folded)
        r"apprend\w*|ameliore\w*|pratique\w*|lire|ecrire|courir|cuisiner|jouer|etudier|",
        r"construire|creer|dessiner|peindre|chanter|parler|entrainer|comprendre|commencer|",
        r"perdre|prendre|preparer|memoriser|mediter|marcher|nager|coder|programmer|developper|",
        r"faire|progresser|reviser|decouvrir|devenir|maitriser|tricoter|coudre|soulever|",
        r"etirer|travailler",
        r")\b"
    ))
    .unwrap()
});

static FILLER_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?:",
        r"i (?:really )?(?:want|would like|wish|need|hope) to |i'?d like to |i d like to |",
        r"my goal is to |",
        r"je (?:veux|voudrais|souhaite|dois|vais) |j'?aimerais |j aimerais |",
        r"mon (?:objectif|but) (?:est|c'est) de ",
        r")"
    ))
    .unwrap()
});

static VAGUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?:",
        // English
        r"be (?:happy|happier|better|successful|rich|the best|a better person)|",
        r"succeed(?: in life)?|be a success|change my life|find myself|",
        r"get my life together|improve myself|feel (?:good|better)|live my best life|",
        // French
        r"reussir(?: ma vie| dans la vie| sa vie)?|etre (?:heureux|heureuse|meilleur|meilleure|riche)|",
        r"changer (?:ma|de) vie|me trouver|aller mieux|etre bien|vivre ma meilleure vie",
        r")[\s.!?]*$"
    ))
    .unwrap()
});

static GREETING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?:hi|hello|hey|yo|hola|good (?:morning|evening)|thanks|thank you|ok|okay|",
        r"bonjour|bonsoir|salut|coucou|merci)",
        r"(?:\s+(?:there|everyone|all|toi|a tous|tout le monde))?[\s!.?,]*$"
    ))
    .unwrap()
});

static INSULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\b(?:idiot\w*|stupid\w*|dumb\w*|moron\w*|loser\w*|jerk\w*|asshole\w*|fuck\w*|",
        r"shit\w*|bitch\w*|bastard\w*|crap\w*|",
        r"connard\w*|connasse\w*|salaud\w*|salope\w*|merde\w*|putain|debile\w*|abruti\w*|",
        r"cretin\w*|imbecile\w*|enfoire\w*|batard\w*)\b"
    ))
    .unwrap()
});

// Same lexicon as INSULT, matched against raw text so the cleaned goal keeps
// its accents and capitalization.
static INSULT_RAW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:idiot\w*|stupid\w*|dumb\w*|moron\w*|loser\w*|jerk\w*|asshole\w*|fuck\w*|",
        r"shit\w*|bitch\w*|bastard\w*|crap\w*|",
        r"connard\w*|connasse\w*|salaud\w*|salope\w*|merde\w*|putain|d[ée]bile\w*|abruti\w*|",
        r"cr[ée]tin\w*|imb[ée]cile\w*|enfoir[ée]\w*|b[aâ]tard\w*)\b"
    ))
    .unwrap()
});

static SEXUAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\b(?:porn\w*|nsfw|nudes?|naked|sext\w*|sex|sexe|sexy|erotic\w*|erotique\w*|hentai|",
        r"escort\w*|pedo\w*|underage|onlyfans|",
        r"(?:minor|child|kid|teen|enfant|mineur\w*|ado)s? (?:nude|naked|nu|nue|nus)\w*)\b"
    ))
    .unwrap()
});

static SENSITIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\b(?:weapons?|guns?|firearms?|rifles?|pistols?|knife|knives|ammo|ammunition|",
        r"drugs?|cannabis|cocaine|meth|hack\w*|lockpick\w*|poison\w*|",
        r"armes?|fusils?|pistolets?|couteaux?|munitions?|drogues?|pirat\w*|crochet\w*)\b"
    ))
    .unwrap()
});

static LEVEL_CLAIM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\b(?:fluent\w*|native|bilingual|expert|mastery|virtuoso|professional|pro|",
        r"perfectly|like a native|",
        r"couramment|bilingue|natif|native|experte?|virtuose|professionnel\w*|parfaitement|",
        r"comme un natif|c1|c2)\b"
    ))
    .unwrap()
});

static FAME_CLAIM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\b(?:famous|celebrity|superstar|star|millionaire|billionaire|",
        r"fameux|fameuse|celebre|celebrite|vedette|millionnaire|milliardaire)\b"
    ))
    .unwrap()
});

static TIMEFRAME_NUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(\d{1,4})\s*(days?|jours?|weeks?|semaines?|months?|mois|years?|ans?|annees?)\b",
    )
    .unwrap()
});

static TIMEFRAME_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\b(?:in|within|en) (?:a|one|une|un) (week|semaine|month|mois|year|an)\b|",
        r"\b(overnight|tomorrow|demain)\b"
    ))
    .unwrap()
});

static NUMERIC_SCOPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\b(\d+(?:[.,]\d+)?)\s*",
        r"(kg|kgs|kilos?|kilograms?|kilogrammes?|books?|livres?|marathons?|languages?|langues?)\b"
    ))
    .unwrap()
});

static CONNECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:and|then|plus|also|as well as|et|puis|ensuite|aussi|ainsi que)\b").unwrap()
});

static OUTCOME_DEPENDENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\b(?:win|wins|winning|won|hired|accepted|admitted|chosen|selected|promoted|elected|",
        r"love me|likes? me|famous|",
        r"gagner|remporter|embauche\w*|accepte\w*|admis\w*|choisie?s?|selectionne\w*|promue?|",
        r"elue?|m'aime\w*|celebre)\b"
    ))
    .unwrap()
});

const ARROWS: [&str; 3] = ["→", "->", "=>"];

/// Kind of implausible claim found in an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimKind {
    /// Fluency or expertise
    Level,
    /// Fame or celebrity
    Fame,
}

impl ClaimKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Level => "level_claim",
            Self::Fame => "fame_claim",
        }
    }
}

/// Unit of an explicit numeric scope marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeUnit {
    Kilograms,
    Books,
    Marathons,
    Languages,
}

impl ScopeUnit {
    fn parse(unit: &str) -> Option<Self> {
        if unit.starts_with("kg") || unit.starts_with("kilo") {
            Some(Self::Kilograms)
        } else if unit.starts_with("book") || unit.starts_with("livre") {
            Some(Self::Books)
        } else if unit.starts_with("marathon") {
            Some(Self::Marathons)
        } else if unit.starts_with("language") || unit.starts_with("langue") {
            Some(Self::Languages)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kilograms => "kg",
            Self::Books => "books",
            Self::Marathons => "marathons",
            Self::Languages => "languages",
        }
    }
}

/// An explicit amount such as `10 kg` or `12 books`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScopeMarker {
    pub unit: ScopeUnit,
    pub amount: f32,
}

pub fn word_count(normalized: &str) -> usize {
    playbook::text::tokens(normalized).len()
}

/// Whether the raw text contains any letter at all.
pub fn has_letters(text: &str) -> bool {
    text.chars().any(char::is_alphabetic)
}

pub fn has_action_verb(normalized: &str) -> bool {
    ACTION_VERB.is_match(normalized)
}

/// Drop a leading "I want to" / "je veux" style prefix.
pub fn strip_filler(normalized: &str) -> &str {
    match FILLER_PREFIX.find(normalized) {
        Some(m) => normalized[m.end()..].trim_start(),
        None => normalized,
    }
}

/// Whether the whole intent is a known vague-goal phrase.
pub fn is_vague(normalized: &str) -> bool {
    VAGUE.is_match(strip_filler(normalized.trim()))
}

pub fn is_greeting_only(normalized: &str) -> bool {
    GREETING.is_match(normalized.trim())
}

pub fn insult_tokens(normalized: &str) -> Vec<String> {
    INSULT
        .find_iter(normalized)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Remove insult tokens from raw text and tidy the whitespace left behind.
pub fn strip_insults(text: &str) -> String {
    let stripped = INSULT_RAW.replace_all(text, " ");
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .to_string()
}

pub fn has_sexual_content(normalized: &str) -> bool {
    SEXUAL.is_match(normalized)
}

/// Weapons, drugs, intrusion: legitimate to learn about, but worth a second look.
pub fn has_sensitive_terms(normalized: &str) -> bool {
    SENSITIVE.is_match(normalized)
}

/// Fame claims take precedence since they are implausible in any domain.
pub fn level_claim(normalized: &str) -> Option<ClaimKind> {
    if FAME_CLAIM.is_match(normalized) {
        Some(ClaimKind::Fame)
    } else if LEVEL_CLAIM.is_match(normalized) {
        Some(ClaimKind::Level)
    } else {
        None
    }
}

/// Shortest timeframe stated in the text, in days.
pub fn timeframe_days(normalized: &str) -> Option<u32> {
    let numeric = TIMEFRAME_NUMERIC.captures_iter(normalized).filter_map(|caps| {
        let count: u32 = caps.get(1)?.as_str().parse().ok()?;
        let unit = caps.get(2)?.as_str();
        Some(count.saturating_mul(unit_days(unit)?))
    });

    let worded = TIMEFRAME_WORD.captures_iter(normalized).filter_map(|caps| {
        let unit = caps.get(1).or_else(|| caps.get(2))?.as_str();
        match unit {
            "overnight" | "tomorrow" | "demain" => Some(1),
            other => unit_days(other),
        }
    });

    numeric.chain(worded).min()
}

fn unit_days(unit: &str) -> Option<u32> {
    if unit.starts_with("day") || unit.starts_with("jour") {
        Some(1)
    } else if unit.starts_with("week") || unit.starts_with("semaine") {
        Some(7)
    } else if unit.starts_with("month") || unit == "mois" {
        Some(30)
    } else if unit.starts_with("year") || unit.starts_with("an") {
        Some(365)
    } else {
        None
    }
}

pub fn numeric_scope(normalized: &str) -> Vec<ScopeMarker> {
    NUMERIC_SCOPE
        .captures_iter(normalized)
        .filter_map(|caps| {
            let amount: f32 = caps.get(1)?.as_str().replace(',', ".").parse().ok()?;
            let unit = ScopeUnit::parse(caps.get(2)?.as_str())?;
            Some(ScopeMarker { unit, amount })
        })
        .collect()
}

pub fn connective_count(normalized: &str) -> usize {
    CONNECTIVE.find_iter(normalized).count()
}

/// Split a "chosen → refined" intent. Both sides must be non-empty.
pub fn split_arrow(text: &str) -> Option<(&str, &str)> {
    let (idx, arrow) = ARROWS
        .iter()
        .filter_map(|a| text.find(a).map(|i| (i, *a)))
        .min_by_key(|(i, _)| *i)?;
    let before = text[..idx].trim();
    let after = text[idx + arrow.len()..].trim();
    if before.is_empty() || after.is_empty() {
        None
    } else {
        Some((before, after))
    }
}

/// CEFR-style level code (`a1` to `c2`) anywhere in the raw text.
pub fn has_language_level_code(text: &str) -> bool {
    playbook::classify::has_level_code(text)
}

/// Whether success depends on other people or chance.
pub fn outcome_dependency(normalized: &str) -> bool {
    OUTCOME_DEPENDENCY.is_match(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_verbs_en_fr() {
        assert!(has_action_verb(&normalize("Improve my Spanish vocabulary")));
        assert!(has_action_verb(&normalize("Apprendre le piano")));
        assert!(has_action_verb(&normalize("Learning to cook")));
        assert!(!has_action_verb(&normalize("réussir ma vie")));
        assert!(!has_action_verb(&normalize("30 jours de guitare")));
        assert!(!has_action_verb(&normalize("you loser")));
    }

    #[test]
    fn test_vague_after_filler() {
        assert!(is_vague(&normalize("réussir ma vie")));
        assert!(is_vague(&normalize("I want to be happier!")));
        assert!(is_vague(&normalize("Je veux être heureuse")));
        assert!(!is_vague(&normalize("be happier at work by journaling daily")));
    }

    #[test]
    fn test_greeting_only() {
        assert!(is_greeting_only(&normalize("Hello there!")));
        assert!(is_greeting_only(&normalize("Salut")));
        assert!(!is_greeting_only(&normalize("hello, teach me chess")));
    }

    #[test]
    fn test_strip_insults_keeps_goal() {
        assert_eq!(strip_insults("Learn fucking guitar"), "Learn guitar");
        assert_eq!(strip_insults("Apprendre ce crétin de solfège"), "Apprendre ce de solfège");
        assert_eq!(insult_tokens(&normalize("Espèce d'IDIOT")), vec!["idiot"]);
    }

    #[test]
    fn test_claims() {
        assert_eq!(level_claim(&normalize("become world-famous")), Some(ClaimKind::Fame));
        assert_eq!(level_claim(&normalize("parler couramment")), Some(ClaimKind::Level));
        assert_eq!(level_claim(&normalize("start running")), None);
    }

    #[test]
    fn test_timeframe() {
        assert_eq!(timeframe_days(&normalize("in 7 days")), Some(7));
        assert_eq!(timeframe_days(&normalize("en 2 semaines")), Some(14));
        assert_eq!(timeframe_days(&normalize("within a month")), Some(30));
        assert_eq!(timeframe_days(&normalize("3 months or 10 days")), Some(10));
        assert_eq!(timeframe_days(&normalize("learn chess")), None);
        assert_eq!(timeframe_days(&normalize("practice 10 minutes a day")), None);
    }

    #[test]
    fn test_numeric_scope() {
        let markers = numeric_scope(&normalize("lose 10 kg and read 2,5 books"));
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0], ScopeMarker { unit: ScopeUnit::Kilograms, amount: 10.0 });
        assert_eq!(markers[1].unit, ScopeUnit::Books);
        assert!((markers[1].amount - 2.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_split_arrow() {
        assert_eq!(
            split_arrow("Learn guitar basics → become world-famous in 7 days"),
            Some(("Learn guitar basics", "become world-famous in 7 days"))
        );
        assert_eq!(split_arrow("a -> b"), Some(("a", "b")));
        assert_eq!(split_arrow("→ b"), None);
        assert_eq!(split_arrow("no arrow"), None);
    }

    #[test]
    fn test_connectives_and_dependency() {
        assert_eq!(connective_count(&normalize("learn piano and guitar then sing")), 2);
        assert!(outcome_dependency(&normalize("win the regional tournament")));
        assert!(!outcome_dependency(&normalize("practice serves every day")));
        assert!(has_language_level_code("Reach B2 in German"));
        assert!(has_sexual_content(&normalize("send nudes")));
        assert!(has_sensitive_terms(&normalize("learn to hack wifi")));
    }
}
