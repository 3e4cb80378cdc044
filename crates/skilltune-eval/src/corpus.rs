//! Labeled prompt sets and the deterministic corpus generator
//!
//! A [`PromptSet`] keeps the judge-visible part of each prompt (id + text)
//! apart from its label. Only the scorer reads labels.

use serde::{Deserialize, Serialize};
use skilltune_judge::terms::{extract_terms, synonyms, Term, TriggerProfile};
use skilltune_types::{
    BlindPrompt, Category, Prompt, PromptId, Result, SeedFailure, SkillDescriptor, TuneError,
    PROMPTS_PER_CATEGORY,
};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// Label side table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Label {
    pub category: Category,
    pub ground_truth: bool,
}

/// Exactly 40 prompts, 10 per category, fixed for a whole tuning session
#[derive(Debug, Clone)]
pub struct PromptSet {
    prompts: Vec<BlindPrompt>,
    labels: HashMap<PromptId, Label>,
}

impl PromptSet {
    /// Validate and split labeled prompts into the blind view and the label table
    pub fn from_prompts(prompts: Vec<Prompt>) -> Result<Self> {
        let mut counts: HashMap<Category, usize> = HashMap::new();
        let mut seen = HashSet::new();

        for prompt in &prompts {
            if prompt.text.trim().is_empty() {
                return Err(TuneError::MalformedPromptSet(format!(
                    "prompt {} ({}) has empty text",
                    prompt.id, prompt.category
                )));
            }
            if prompt.ground_truth != prompt.category.ground_truth() {
                return Err(TuneError::MalformedPromptSet(format!(
                    "prompt {} is labeled {} but has ground truth {}",
                    prompt.id, prompt.category, prompt.ground_truth
                )));
            }
            if !seen.insert(prompt.id) {
                return Err(TuneError::MalformedPromptSet(format!(
                    "duplicate prompt id {}",
                    prompt.id
                )));
            }
            *counts.entry(prompt.category).or_default() += 1;
        }

        let wrong: Vec<String> = Category::ALL
            .iter()
            .filter_map(|c| {
                let n = counts.get(c).copied().unwrap_or(0);
                (n != PROMPTS_PER_CATEGORY)
                    .then(|| format!("{c} has {n} prompts (expected {PROMPTS_PER_CATEGORY})"))
            })
            .collect();
        if !wrong.is_empty() {
            return Err(TuneError::MalformedPromptSet(wrong.join("; ")));
        }

        let labels = prompts
            .iter()
            .map(|p| {
                (
                    p.id,
                    Label {
                        category: p.category,
                        ground_truth: p.ground_truth,
                    },
                )
            })
            .collect();
        let prompts = prompts.iter().map(Prompt::blind).collect();

        Ok(Self { prompts, labels })
    }

    /// Parse a hand-written set: `prompts: [{text, category}]`, ids in file order
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let authored: AuthoredSet = serde_yaml::from_str(yaml)?;
        let prompts = authored
            .prompts
            .into_iter()
            .enumerate()
            .map(|(i, p)| Prompt::new(PromptId(i), p.text, p.category))
            .collect();
        Self::from_prompts(prompts)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        let set = Self::from_yaml(&yaml)?;
        info!("Loaded {} prompts from {:?}", set.len(), path);
        Ok(set)
    }

    /// Judge-visible view: ids and texts only
    pub fn prompts(&self) -> &[BlindPrompt] {
        &self.prompts
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub(crate) fn label(&self, id: PromptId) -> Option<Label> {
        self.labels.get(&id).copied()
    }

    /// Stems of every prompt whose ground truth is `ground_truth`
    pub(crate) fn stems_labeled(&self, ground_truth: bool) -> HashSet<String> {
        self.prompts
            .iter()
            .filter(|p| self.label(p.id).is_some_and(|l| l.ground_truth == ground_truth))
            .flat_map(|p| extract_terms(&p.text))
            .map(|t| t.stem)
            .collect()
    }

    /// Re-join texts with labels, for export and display only
    pub fn to_labeled(&self) -> Vec<Prompt> {
        self.prompts
            .iter()
            .filter_map(|p| {
                self.labels.get(&p.id).map(|label| Prompt {
                    id: p.id,
                    text: p.text.clone(),
                    category: label.category,
                    ground_truth: label.ground_truth,
                })
            })
            .collect()
    }

    /// Same shape [`PromptSet::from_yaml`] reads
    pub fn to_yaml(&self) -> Result<String> {
        let authored = AuthoredSet {
            prompts: self
                .to_labeled()
                .into_iter()
                .map(|p| AuthoredPrompt {
                    text: p.text,
                    category: p.category,
                })
                .collect(),
        };
        Ok(serde_yaml::to_string(&authored)?)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AuthoredSet {
    prompts: Vec<AuthoredPrompt>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AuthoredPrompt {
    text: String,
    category: Category,
}

// {a} and {b} are replaced with trigger terms, {s} with a paraphrase
const EXACT_TEMPLATES: [&str; 5] = [
    "Help me with {a} for my project",
    "Can you do some {a} work on this {b}?",
    "I need {a} and {b} done today",
    "Take care of the {a} for me",
    "Let's focus on {a} at once",
];

const PARAPHRASE_TEMPLATES: [&str; 3] = [
    "Could you put together a {s} for me?",
    "I'd like a fresh {s} on this topic",
    "Something along the lines of a {s} would be great",
];

const LOOSE_TEMPLATES: [&str; 2] = [
    "ok so {a} stuff, you know what to do",
    "need that {a} thing again, same as last time",
];

const INDIRECT_TEMPLATES: [&str; PROMPTS_PER_CATEGORY] = [
    "My {a} keeps falling flat and nobody engages with it",
    "I have notes that should become a {a}",
    "The {a} I started yesterday is still unfinished",
    "Turn this rough idea into a proper {a}",
    "I always struggle when it comes to {a}",
    "Here is some raw material, shape it into a {a}",
    "Last time the {a} came out too stiff, let's redo it",
    "I'm staring at a blank page where my {a} should be",
    "Could this announcement work better as a {a}?",
    "Everyone says my {a} is too wordy, tighten it up",
];

const AMBIGUOUS_TEMPLATES: [&str; PROMPTS_PER_CATEGORY] = [
    "Should I use {a} or a different approach here?",
    "What are my options besides {a}?",
    "Compare {a} with the alternatives before I decide",
    "Not sure if I want {a} or a full report, thoughts?",
    "Is {a} even the right tool for this?",
    "Something about {a}, but I haven't decided what yet",
    "Could you explain the history of {a}?",
    "Which suits my team more, {a} or a meeting?",
    "Weigh whether {a} fits our strategy at all",
    "I might need {a}, or maybe a spreadsheet, not sure",
];

const UNRELATED_POOL: [&str; 8] = [
    "Fix the failing unit test in the payment module",
    "Rename the variables in this function to snake case",
    "Set up a cron job that backs up the database nightly",
    "Explain why this SQL query is slow",
    "Resize all images in the assets folder to 800px",
    "Convert this CSV file into JSON",
    "Find the memory leak in the image cache",
    "Add pagination to the orders endpoint",
];

const CROSS_DOMAIN_POOL: [&str; 5] = [
    "What's a good recipe for banana bread?",
    "Plan a three day itinerary for Lisbon",
    "Suggest stretches for lower back pain",
    "Recommend a sci-fi novel for a long flight",
    "How do I repot an orchid?",
];

const ZERO_OVERLAP_POOL: [&str; 3] = [
    "qwerty asdf zxcv",
    "purple elephant marmalade",
    "Thanks, bye for now",
];

/// Builds the 40-prompt test corpus for a descriptor.
///
/// Deterministic: the same descriptor and seed always yield the same set.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorpusGenerator;

impl CorpusGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(
        &self,
        descriptor: &SkillDescriptor,
        seed: Option<&SeedFailure>,
    ) -> Result<PromptSet> {
        let profile = TriggerProfile::from_descriptor(descriptor);
        let terms: Vec<String> = if profile.triggers.is_empty() {
            vec![descriptor.name.replace('-', " ")]
        } else {
            profile.triggers.iter().map(|t| t.surface.clone()).collect()
        };
        let term = |i: usize| terms[i % terms.len()].as_str();

        let mut texts: Vec<(String, Category)> = Vec::with_capacity(PROMPTS_PER_CATEGORY * 4);

        // MUST_INVOKE: 5 exact, 3 paraphrased, 2 loose
        for (i, template) in EXACT_TEMPLATES.iter().enumerate() {
            texts.push((fill(template, term(i), term(i + 1)), Category::MustInvoke));
        }
        let paraphrases = paraphrases(&profile.triggers);
        for (i, template) in PARAPHRASE_TEMPLATES.iter().enumerate() {
            let phrase = paraphrases
                .get(i)
                .map(String::as_str)
                .unwrap_or_else(|| term(i + EXACT_TEMPLATES.len()));
            texts.push((template.replace("{s}", phrase), Category::MustInvoke));
        }
        for (i, template) in LOOSE_TEMPLATES.iter().enumerate() {
            texts.push((fill(template, term(i), term(i + 1)), Category::MustInvoke));
        }

        // edge buckets; a seed failure takes the first slot of its bucket
        let mut indirect: Vec<String> = INDIRECT_TEMPLATES
            .iter()
            .enumerate()
            .map(|(i, t)| fill(t, term(i), term(i + 1)))
            .collect();
        let mut ambiguous: Vec<String> = AMBIGUOUS_TEMPLATES
            .iter()
            .enumerate()
            .map(|(i, t)| fill(t, term(i), term(i + 1)))
            .collect();
        if let Some(seed) = seed {
            let bucket = match seed.category() {
                Category::ShouldInvokeEdge => &mut indirect,
                _ => &mut ambiguous,
            };
            debug!("Seeding {} with {:?}", seed.category(), seed.text);
            bucket[0] = seed.text.clone();
        }
        texts.extend(indirect.into_iter().map(|t| (t, Category::ShouldInvokeEdge)));
        texts.extend(ambiguous.into_iter().map(|t| (t, Category::ShouldNotInvokeEdge)));

        // MUST_NOT_INVOKE: 5 unrelated, 3 cross-domain, 2 zero-overlap
        for text in pick_unrelated(&UNRELATED_POOL, 5, &profile)
            .into_iter()
            .chain(pick_unrelated(&CROSS_DOMAIN_POOL, 3, &profile))
            .chain(pick_unrelated(&ZERO_OVERLAP_POOL, 2, &profile))
        {
            texts.push((text.to_string(), Category::MustNotInvoke));
        }

        let prompts = texts
            .into_iter()
            .enumerate()
            .map(|(i, (text, category))| Prompt::new(PromptId(i), text, category))
            .collect();

        let set = PromptSet::from_prompts(prompts)?;
        info!(
            "Generated {} prompts for '{}' from {} trigger terms",
            set.len(),
            descriptor.name,
            terms.len()
        );
        Ok(set)
    }
}

fn fill(template: &str, a: &str, b: &str) -> String {
    template.replace("{a}", a).replace("{b}", b)
}

/// Known paraphrases of the trigger terms, in trigger order
fn paraphrases(triggers: &[Term]) -> Vec<String> {
    triggers
        .iter()
        .flat_map(|t| synonyms(t).iter().map(|s| s.to_string()))
        .collect()
}

/// Take `count` pool items that share no trigger term, topping up with
/// overlapping ones only when the pool runs dry
fn pick_unrelated<'a>(pool: &[&'a str], count: usize, profile: &TriggerProfile) -> Vec<&'a str> {
    let overlaps = |text: &str| {
        extract_terms(text).iter().any(|t| profile.is_trigger(&t.stem))
    };
    let (clean, overlapping): (Vec<&str>, Vec<&str>) =
        pool.iter().copied().partition(|text| !overlaps(*text));
    clean.into_iter().chain(overlapping).take(count).collect()
}
