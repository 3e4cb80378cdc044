//! Term extraction shared by the keyword classifier, the corpus generator
//! and the descriptor tuner
//!
//! Terms are lowercase content words with stop-words removed and a light
//! suffix stemming applied, so "drafting", "drafted" and "drafts" all
//! compare equal to "draft".

use skilltune_types::SkillDescriptor;

/// Words that never count as trigger terms
const STOPWORDS: &[&str] = &[
    // articles, conjunctions, prepositions
    "a", "an", "the", "and", "or", "but", "nor", "yet", "so", "in", "on", "at", "to", "for",
    "of", "with", "by", "from", "as", "into", "onto", "upon", "out", "up", "down", "about",
    "over", "after", "before", "between", "under", "above", "below", "through", "during",
    "within", "without", "across", "toward", "towards", "among", "around", "via", "per",
    // auxiliaries and common verbs
    "is", "was", "are", "were", "been", "be", "being", "am", "have", "has", "had", "having",
    "do", "does", "did", "doing", "done", "don", "will", "would", "could", "should", "may",
    "might", "must", "shall", "can", "need", "needs", "get", "got", "make", "made", "let",
    "keep", "put", "set", "take", "give", "see", "use", "using", "used", "uses", "like",
    "want", "wanted", "work", "run", "call", "go", "going", "try", "write", "writing",
    "create", "help", "helps", "helping", "handle", "handles", "apply", "applies", "avoid",
    "intended", "mention", "mentions", "cover", "covers", "ask", "asks", "asked", "tell",
    // pronouns and determiners
    "it", "its", "they", "them", "their", "we", "our", "us", "you", "your", "he", "she",
    "him", "her", "his", "i", "me", "my", "mine", "this", "that", "these", "those", "all",
    "any", "each", "every", "both", "few", "more", "most", "other", "some", "such", "many",
    "much", "another", "something", "anything", "thing", "things", "one",
    // adverbs and question words
    "only", "own", "same", "than", "too", "very", "just", "also", "now", "here", "there",
    "again", "once", "always", "never", "often", "still", "already", "even", "quite",
    "rather", "maybe", "really", "not", "no", "yes", "if", "then", "else", "when", "where",
    "how", "what", "which", "who", "why", "whether", "instead", "please", "hey", "hi",
    // request filler
    "request", "requests", "user", "users", "skill", "skills", "task", "tasks", "related",
    "phrasing", "clarification", "new", "good", "quick", "quickly", "sure", "well",
];

/// Sentence prefixes that turn a description sentence into exclusion language
const EXCLUSION_MARKERS: &[&str] = &[
    "do not use",
    "don't use",
    "not for",
    "never use",
    "ask for clarification",
    "does not handle",
    "not intended for",
    "avoid using",
];

/// Paraphrase table keyed by stem
const SYNONYMS: &[(&str, &[&str])] = &[
    ("tweet", &["x post", "social post"]),
    ("thread", &["tweetstorm", "post series"]),
    ("post", &["update", "status"]),
    ("draft", &["compose", "sketch"]),
    ("review", &["audit", "critique"]),
    ("blog", &["article", "essay"]),
    ("article", &["essay", "writeup"]),
    ("domain", &["website address", "url"]),
    ("name", &["title", "brand"]),
    ("bug", &["defect", "glitch"]),
    ("test", &["check", "assertion"]),
    ("code", &["source", "program"]),
    ("email", &["message", "mail"]),
    ("summary", &["recap", "digest"]),
    ("summarize", &["recap", "condense"]),
    ("translate", &["localize", "convert"]),
    ("debug", &["troubleshoot", "diagnose"]),
    ("deploy", &["ship", "release"]),
    ("refactor", &["restructure", "clean"]),
    ("document", &["docs", "readme"]),
    ("outline", &["skeleton", "structure"]),
];

/// Words a request uses for the same job without naming it, keyed by stem
const RELATED: &[(&str, &[&str])] = &[
    ("tweet", &["thread", "retweet", "hashtag"]),
    ("twitter", &["tweet", "thread", "hashtag"]),
    ("writer", &["draft", "compose", "copy"]),
    ("blog", &["article", "newsletter"]),
    ("review", &["audit", "critique"]),
    ("debug", &["troubleshoot", "diagnose", "bug"]),
    ("test", &["assertion", "coverage"]),
    ("deploy", &["ship", "release"]),
    ("summarize", &["recap", "digest"]),
    ("translate", &["localize", "translation"]),
];

/// A content word: `stem` is compared, `surface` is shown to people
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub stem: String,
    pub surface: String,
}

/// Reduce a lowercase word to a comparable stem
pub fn stem(word: &str) -> String {
    let len = word.len();
    if len > 4 && word.ends_with("ies") {
        format!("{}y", &word[..len - 3])
    } else if len > 5 && word.ends_with("ing") {
        word[..len - 3].to_string()
    } else if len > 4 && word.ends_with("ed") {
        word[..len - 2].to_string()
    } else if len > 3
        && word.ends_with('s')
        && !word.ends_with("ss")
        && !word.ends_with("us")
        && !word.ends_with("is")
    {
        word[..len - 1].to_string()
    } else {
        word.to_string()
    }
}

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Content terms of a text in order of first appearance, deduplicated by stem
pub fn extract_terms(text: &str) -> Vec<Term> {
    let mut terms: Vec<Term> = Vec::new();
    for raw in text.split(|c: char| !c.is_alphanumeric()) {
        let word = raw.to_lowercase();
        if word.len() < 2 || is_stopword(&word) || word.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let stem = stem(&word);
        if is_stopword(&stem) || terms.iter().any(|t| t.stem == stem) {
            continue;
        }
        terms.push(Term {
            stem,
            surface: word,
        });
    }
    terms
}

/// Split a description into sentences
pub fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(['.', ';', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub fn is_exclusion_sentence(sentence: &str) -> bool {
    let lowered = sentence.trim().to_lowercase();
    EXCLUSION_MARKERS.iter().any(|m| lowered.starts_with(m))
}

/// Paraphrases for a term, empty when none are known
pub fn synonyms(term: &Term) -> &'static [&'static str] {
    SYNONYMS
        .iter()
        .find(|(key, _)| *key == term.stem)
        .map(|(_, words)| *words)
        .unwrap_or(&[])
}

/// Related words for a term, empty when none are known
pub fn related(term: &Term) -> &'static [&'static str] {
    RELATED
        .iter()
        .find(|(key, _)| *key == term.stem)
        .map(|(_, words)| *words)
        .unwrap_or(&[])
}

/// What a descriptor says should and should not trigger it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerProfile {
    /// Name segments first, then description terms, then related words
    pub triggers: Vec<Term>,
    /// Stems of the name segments; a hit on one of these weighs double
    pub anchors: Vec<String>,
    /// Terms from exclusion sentences that are not also triggers
    pub exclusions: Vec<Term>,
}

impl TriggerProfile {
    pub fn from_descriptor(descriptor: &SkillDescriptor) -> Self {
        let mut triggers = extract_terms(&descriptor.name.replace('-', " "));
        let anchors = triggers.iter().map(|t| t.stem.clone()).collect();
        let mut excluded = Vec::new();

        for sentence in sentences(&descriptor.description) {
            let target = if is_exclusion_sentence(sentence) {
                &mut excluded
            } else {
                &mut triggers
            };
            for term in extract_terms(sentence) {
                if !target.iter().any(|t: &Term| t.stem == term.stem) {
                    target.push(term);
                }
            }
        }

        let expanded: Vec<Term> = triggers
            .iter()
            .flat_map(|t| related(t).iter())
            .flat_map(|word| extract_terms(word))
            .collect();
        for term in expanded {
            if !triggers.iter().any(|t| t.stem == term.stem) {
                triggers.push(term);
            }
        }

        let exclusions = excluded
            .into_iter()
            .filter(|e| !triggers.iter().any(|t| t.stem == e.stem))
            .collect();

        Self {
            triggers,
            anchors,
            exclusions,
        }
    }

    pub fn is_trigger(&self, stem: &str) -> bool {
        self.triggers.iter().any(|t| t.stem == stem)
    }

    /// Evidence a matched stem contributes: 2 for a name segment, 1 for any
    /// other trigger, 0 otherwise
    pub fn weight(&self, stem: &str) -> usize {
        if self.anchors.iter().any(|a| a == stem) {
            2
        } else if self.is_trigger(stem) {
            1
        } else {
            0
        }
    }

    pub fn is_exclusion(&self, stem: &str) -> bool {
        self.exclusions.iter().any(|t| t.stem == stem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stems(terms: &[Term]) -> Vec<&str> {
        terms.iter().map(|t| t.stem.as_str()).collect()
    }

    #[test]
    fn test_stem() {
        assert_eq!(stem("drafting"), "draft");
        assert_eq!(stem("drafted"), "draft");
        assert_eq!(stem("threads"), "thread");
        assert_eq!(stem("stories"), "story");
        assert_eq!(stem("class"), "class");
        assert_eq!(stem("status"), "status");
        assert_eq!(stem("analysis"), "analysis");
        assert_eq!(stem("bus"), "bus");
    }

    #[test]
    fn test_extract_terms_drops_stopwords_and_duplicates() {
        let terms = extract_terms("Please draft a thread, then more threads about productivity!");
        assert_eq!(stems(&terms), vec!["draft", "thread", "productivity"]);
        assert_eq!(terms[1].surface, "thread");
    }

    #[test]
    fn test_extract_terms_of_filler_is_empty() {
        assert!(extract_terms("can you help me with this?").is_empty());
        assert!(extract_terms("   ").is_empty());
    }

    #[test]
    fn test_profile_splits_exclusions() {
        let descriptor = SkillDescriptor::new(
            "tweet-writer",
            "Helps write engaging Twitter/X posts and threads. Use when drafting tweets. \
             Do not use for blog posts or long-form articles.",
        );
        let profile = TriggerProfile::from_descriptor(&descriptor);

        assert_eq!(profile.triggers[0].stem, "tweet");
        assert_eq!(profile.triggers[1].stem, "writer");
        assert!(profile.is_trigger("thread"));
        assert!(profile.is_trigger("draft"));
        assert!(profile.is_trigger("post"));
        // "posts" is also a trigger so it is not an exclusion
        assert!(!profile.is_exclusion("post"));
        assert!(profile.is_exclusion("blog"));
        assert!(profile.is_exclusion("article"));
    }

    #[test]
    fn test_profile_folds_in_related_words() {
        let descriptor = SkillDescriptor::new(
            "tweet-writer",
            "Helps write engaging Twitter/X posts...",
        );
        let profile = TriggerProfile::from_descriptor(&descriptor);

        assert_eq!(profile.anchors, vec!["tweet", "writer"]);
        assert!(profile.is_trigger("thread"));
        assert!(profile.is_trigger("draft"));
        assert!(!profile.is_trigger("blog"));
        assert_eq!(profile.weight("tweet"), 2);
        assert_eq!(profile.weight("thread"), 1);
        assert_eq!(profile.weight("post"), 1);
        assert_eq!(profile.weight("productivity"), 0);
    }

    #[test]
    fn test_related_words_never_become_exclusions() {
        let descriptor = SkillDescriptor::new(
            "tweet-writer",
            "Writes short posts. Do not use for threads or blog posts.",
        );
        let profile = TriggerProfile::from_descriptor(&descriptor);
        assert!(profile.is_trigger("thread"));
        assert!(!profile.is_exclusion("thread"));
        assert!(profile.is_exclusion("blog"));
    }

    #[test]
    fn test_exclusion_sentence_markers() {
        assert!(is_exclusion_sentence("Do not use for blog posts"));
        assert!(is_exclusion_sentence("  not for spreadsheets"));
        assert!(is_exclusion_sentence("Ask for clarification instead when the request is vague"));
        assert!(!is_exclusion_sentence("Use when drafting tweets"));
    }

    #[test]
    fn test_synonyms_lookup() {
        let terms = extract_terms("drafts");
        assert_eq!(synonyms(&terms[0]), &["compose", "sketch"]);
        let unknown = extract_terms("zebra");
        assert!(synonyms(&unknown[0]).is_empty());
    }
}
