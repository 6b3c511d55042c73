//! Read-only lookup table over a loaded TS document.
//!
//! A [`Catalog`] is built once and never mutated afterwards, so it can be
//! shared between threads behind an `Arc` or a `static` without locking.
//!
//! # Lookup rules
//!
//! | Entry | Result |
//! |-------|--------|
//! | key absent | [`NotFoundError`] |
//! | finished, vanished, obsolete | stored text, unchanged |
//! | unfinished | `source`, unless [`UnfinishedPolicy::Translation`] is set |
//! | empty stored text | `source` |
//! | numerus | form chosen by the catalog's [`PluralRule`]; form 0 without a count |

use crate::error::{NotFoundError, ParseError, WriteError};
use crate::placeholder;
use crate::plural::PluralRule;
use crate::ts::{Context, Message, TranslationBody, TranslationType, Ts};
use crate::xmlify::AsElement;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

/// What an unfinished entry resolves to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnfinishedPolicy {
    /// Show the untranslated source text.
    Source,
    /// Use the draft translation when there is one.
    Translation,
}
impl Default for UnfinishedPolicy {
    fn default() -> Self {
        Self::Source
    }
}
impl Display for UnfinishedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Source => "source",
            Self::Translation => "translation",
        })
    }
}
impl FromStr for UnfinishedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source" => Ok(Self::Source),
            "translation" => Ok(Self::Translation),
            _ => Err("Expected source or translation".to_owned()),
        }
    }
}

/// Message counts by status.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub contexts: usize,
    pub messages: usize,
    pub finished: usize,
    pub unfinished: usize,
    pub vanished: usize,
    pub obsolete: usize,
    pub numerus: usize,
}
impl Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} message(s) in {} context(s): {} finished, {} unfinished, {} vanished, {} obsolete ({} with plural forms)",
            self.messages,
            self.contexts,
            self.finished,
            self.unfinished,
            self.vanished,
            self.obsolete,
            self.numerus
        )
    }
}

// context -> source -> [(comment, context position, message position)].
// Most sources carry a single comment, so the inner list stays short.
type Index = HashMap<String, HashMap<String, Vec<(String, usize, usize)>>>;

#[derive(Clone, Debug)]
pub struct Catalog {
    ts: Ts,
    index: Index,
    rule: PluralRule,
    policy: UnfinishedPolicy,
}

impl Catalog {
    /// Loads and indexes a `.ts` file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let catalog = Self::from_ts(Ts::load(path)?)?;
        debug!(path = %path.display(), stats = %catalog.stats(), "loaded catalog");
        Ok(catalog)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ParseError> {
        Self::from_ts(Ts::from_reader(reader)?)
    }

    /// Indexes a document, rejecting repeated `(context, source, comment)` keys.
    pub fn from_ts(ts: Ts) -> Result<Self, ParseError> {
        let mut index = Index::with_capacity(ts.contexts.len());
        for (c, ctx) in ts.contexts.iter().enumerate() {
            let sources = index.entry(ctx.name.clone()).or_default();
            for (m, msg) in ctx.messages.iter().enumerate() {
                let comments = sources.entry(msg.source.clone()).or_default();
                if comments.iter().any(|(comment, _, _)| comment == msg.disambiguation()) {
                    return Err(ParseError::DuplicateMessage {
                        context: ctx.name.clone(),
                        source_text: msg.source.clone(),
                        comment: msg.disambiguation().to_owned(),
                    });
                }
                comments.push((msg.disambiguation().to_owned(), c, m));
            }
        }
        let rule = ts
            .language
            .as_deref()
            .map(PluralRule::for_language)
            .unwrap_or_default();
        Ok(Self {
            ts,
            index,
            rule,
            policy: UnfinishedPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: UnfinishedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Selects plural forms by `language` instead of the file's own attribute.
    pub fn with_language(mut self, language: &str) -> Self {
        self.rule = PluralRule::for_language(language);
        self
    }

    pub fn language(&self) -> Option<&str> {
        self.ts.language.as_deref()
    }

    pub fn source_language(&self) -> Option<&str> {
        self.ts.source_language.as_deref()
    }

    pub fn plural_rule(&self) -> PluralRule {
        self.rule
    }

    pub fn policy(&self) -> UnfinishedPolicy {
        self.policy
    }

    pub fn document(&self) -> &Ts {
        &self.ts
    }

    pub fn into_document(self) -> Ts {
        self.ts
    }

    pub fn contexts(&self) -> impl Iterator<Item = &Context> {
        self.ts.contexts.iter()
    }

    pub fn len(&self) -> usize {
        self.ts.contexts.iter().map(|ctx| ctx.messages.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The message stored under the key, if any. An empty comment matches none.
    pub fn message(&self, context: &str, source: &str, comment: Option<&str>) -> Option<&Message> {
        let comment = comment.unwrap_or("");
        let &(_, c, m) = self
            .index
            .get(context)?
            .get(source)?
            .iter()
            .find(|(stored, _, _)| stored == comment)?;
        self.ts.contexts.get(c)?.messages.get(m)
    }

    /// Returns the text to display for a key.
    ///
    /// `count` picks the plural form of a numerus message and is ignored
    /// otherwise. The returned text is exactly what the file stores; `%n`
    /// is not substituted.
    pub fn lookup(
        &self,
        context: &str,
        source: &str,
        comment: Option<&str>,
        count: Option<u64>,
    ) -> Result<&str, NotFoundError> {
        match self.message(context, source, comment) {
            Some(msg) => Ok(self.resolve(msg, count)),
            None => Err(NotFoundError {
                context: context.to_owned(),
                source_text: source.to_owned(),
                comment: comment.map(str::to_owned),
            }),
        }
    }

    /// Like [`Catalog::lookup`], but never fails: a missing key is logged
    /// and the source text shown instead. `%n` is replaced with `count`.
    pub fn translate(
        &self,
        context: &str,
        source: &str,
        comment: Option<&str>,
        count: Option<u64>,
    ) -> String {
        let text = match self.lookup(context, source, comment, count) {
            Ok(text) => text,
            Err(err) => {
                warn!("{}; showing source text", err);
                source
            }
        };
        match count {
            Some(n) => placeholder::substitute_count(text, n).into_owned(),
            None => text.to_owned(),
        }
    }

    fn resolve<'a>(&self, msg: &'a Message, count: Option<u64>) -> &'a str {
        let translation = match &msg.translation {
            Some(translation) => translation,
            None => return &msg.source,
        };
        if translation.type_ == TranslationType::Unfinished && self.policy == UnfinishedPolicy::Source {
            return &msg.source;
        }
        let text = match &translation.body {
            TranslationBody::Text(text) => text.primary(),
            TranslationBody::NumerusForms(forms) => {
                let i = count.map_or(0, |n| self.rule.form_index(n));
                forms
                    .get(i)
                    .or_else(|| forms.last())
                    .map_or("", |form| form.text.primary())
            }
        };
        if text.is_empty() {
            &msg.source
        } else {
            text
        }
    }

    pub fn stats(&self) -> Stats {
        let mut stats = Stats {
            contexts: self.ts.contexts.len(),
            ..Default::default()
        };
        for (_, msg) in self.ts.messages() {
            stats.messages += 1;
            if msg.numerus {
                stats.numerus += 1;
            }
            match msg.status() {
                TranslationType::Finished => stats.finished += 1,
                TranslationType::Unfinished => stats.unfinished += 1,
                TranslationType::Vanished => stats.vanished += 1,
                TranslationType::Obsolete => stats.obsolete += 1,
            }
        }
        stats
    }

    /// Serializes the catalog back to TS XML.
    pub fn write<W: Write>(&self, writer: W) -> Result<(), xmltree::Error> {
        self.ts.clone().into_element().write(writer)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), WriteError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| WriteError::Io {
            path: path.to_owned(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        self.write(&mut writer)?;
        writer.flush().map_err(|source| WriteError::Io {
            path: path.to_owned(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts::{Translation, TranslationText};

    fn message(source: &str, comment: Option<&str>, translation: Translation) -> Message {
        Message {
            comment: comment.map(str::to_owned),
            translation: Some(translation),
            ..Message::new(source)
        }
    }

    fn catalog() -> Catalog {
        let mut ts = Ts::new(Some("en".into()), Some("he".into()));
        let mut ctx = Context::new("UIMachineSettingsGeneral");
        ctx.messages = vec![
            message("Name:", None, Translation::finished("שם:")),
            message("English", Some("Native language name"), Translation::finished("עברית")),
            message("English", Some("Language name, in English"), Translation::finished("Hebrew")),
            message(
                "Snapshot Folder",
                None,
                Translation {
                    type_: TranslationType::Unfinished,
                    ..Translation::finished("תיקיית תמונות מצב")
                },
            ),
            message("Description", None, Translation::finished("")),
            message(
                "%n day(s)",
                None,
                Translation::plural(TranslationType::Finished, ["יום %n", "%n ימים"]),
            ),
            message(
                "Old Label",
                None,
                Translation {
                    type_: TranslationType::Vanished,
                    ..Translation::finished("תווית ישנה")
                },
            ),
            Message {
                translation: None,
                ..Message::new("Untranslated")
            },
        ];
        ctx.messages[5].numerus = true;
        ts.contexts.push(ctx);
        Catalog::from_ts(ts).unwrap()
    }

    #[test]
    fn finds_finished_translation() {
        assert_eq!(catalog().lookup("UIMachineSettingsGeneral", "Name:", None, None), Ok("שם:"));
    }

    #[test]
    fn comment_disambiguates() {
        let c = catalog();
        let ctx = "UIMachineSettingsGeneral";
        assert_eq!(c.lookup(ctx, "English", Some("Native language name"), None), Ok("עברית"));
        assert_eq!(c.lookup(ctx, "English", Some("Language name, in English"), None), Ok("Hebrew"));
        assert!(c.lookup(ctx, "English", None, None).is_err());
    }

    #[test]
    fn empty_comment_is_no_comment() {
        let c = catalog();
        assert_eq!(c.lookup("UIMachineSettingsGeneral", "Name:", Some(""), None), Ok("שם:"));
    }

    #[test]
    fn missing_key_is_an_error() {
        let err = catalog().lookup("UIMachineSettingsGeneral", "Nope", None, None).unwrap_err();
        assert_eq!(err.source_text, "Nope");
        assert_eq!(err.context, "UIMachineSettingsGeneral");
        assert!(catalog().lookup("NoSuchContext", "Name:", None, None).is_err());
    }

    #[test]
    fn unfinished_follows_policy() {
        let c = catalog();
        let ctx = "UIMachineSettingsGeneral";
        assert_eq!(c.lookup(ctx, "Snapshot Folder", None, None), Ok("Snapshot Folder"));
        let c = c.with_policy(UnfinishedPolicy::Translation);
        assert_eq!(c.lookup(ctx, "Snapshot Folder", None, None), Ok("תיקיית תמונות מצב"));
        assert_eq!(c.lookup(ctx, "Untranslated", None, None), Ok("Untranslated"));
    }

    #[test]
    fn empty_translation_falls_back_to_source() {
        assert_eq!(
            catalog().lookup("UIMachineSettingsGeneral", "Description", None, None),
            Ok("Description")
        );
    }

    #[test]
    fn whitespace_translation_is_not_empty() {
        let doc = r#"<TS version="2.1" language="he">
<context>
    <name>UIIndicatorsPool</name>
    <message>
        <source>Separator</source>
        <translation> </translation>
    </message>
</context>
</TS>"#;
        let c = Catalog::from_reader(doc.as_bytes()).unwrap();
        assert_eq!(c.lookup("UIIndicatorsPool", "Separator", None, None), Ok(" "));
        let mut out = Vec::new();
        c.write(&mut out).unwrap();
        let reloaded = Catalog::from_reader(&out[..]).unwrap();
        assert_eq!(reloaded.lookup("UIIndicatorsPool", "Separator", None, None), Ok(" "));
    }

    #[test]
    fn vanished_translation_is_still_returned() {
        assert_eq!(
            catalog().lookup("UIMachineSettingsGeneral", "Old Label", None, None),
            Ok("תווית ישנה")
        );
    }

    #[test]
    fn selects_hebrew_plural_forms() {
        let c = catalog();
        let ctx = "UIMachineSettingsGeneral";
        assert_eq!(c.lookup(ctx, "%n day(s)", None, Some(1)), Ok("יום %n"));
        assert_eq!(c.lookup(ctx, "%n day(s)", None, Some(0)), Ok("%n ימים"));
        assert_eq!(c.lookup(ctx, "%n day(s)", None, Some(2)), Ok("%n ימים"));
        assert_eq!(c.lookup(ctx, "%n day(s)", None, Some(17)), Ok("%n ימים"));
        assert_eq!(c.lookup(ctx, "%n day(s)", None, None), Ok("יום %n"));
    }

    #[test]
    fn missing_plural_form_uses_last() {
        let c = catalog().with_language("ru");
        assert_eq!(c.plural_rule(), PluralRule::Slavic);
        assert_eq!(c.lookup("UIMachineSettingsGeneral", "%n day(s)", None, Some(5)), Ok("%n ימים"));
    }

    #[test]
    fn translate_substitutes_count_and_falls_back() {
        let c = catalog();
        let ctx = "UIMachineSettingsGeneral";
        assert_eq!(c.translate(ctx, "%n day(s)", None, Some(3)), "3 ימים");
        assert_eq!(c.translate(ctx, "Missing %n", None, Some(3)), "Missing 3");
        assert_eq!(c.translate(ctx, "Missing", None, None), "Missing");
    }

    #[test]
    fn rejects_duplicate_keys() {
        let mut ts = Ts::new(None, Some("he".into()));
        let mut ctx = Context::new("UIWizardNewVM");
        ctx.messages = vec![
            message("Name", Some("vm"), Translation::finished("שם")),
            message("Name", Some("vm"), Translation::finished("שם אחר")),
        ];
        ts.contexts.push(ctx);
        match Catalog::from_ts(ts) {
            Err(ParseError::DuplicateMessage {
                context,
                source_text,
                comment,
            }) => {
                assert_eq!(context, "UIWizardNewVM");
                assert_eq!(source_text, "Name");
                assert_eq!(comment, "vm");
            }
            other => panic!("expected duplicate error, got {:?}", other),
        }
    }

    #[test]
    fn repeated_context_blocks_share_keys() {
        let mut ts = Ts::new(None, Some("he".into()));
        for _ in 0..2 {
            let mut ctx = Context::new("UIWizardNewVM");
            ctx.messages.push(message("Name", None, Translation::finished("שם")));
            ts.contexts.push(ctx);
        }
        assert!(matches!(Catalog::from_ts(ts), Err(ParseError::DuplicateMessage { .. })));
    }

    #[test]
    fn same_source_without_comment_twice_is_duplicate() {
        let mut ts = Ts::new(None, Some("he".into()));
        let mut ctx = Context::new("UIWizardNewVM");
        ctx.messages = vec![
            message("Name", None, Translation::finished("שם")),
            message("Name", Some(""), Translation::finished("שם")),
        ];
        ts.contexts.push(ctx);
        assert!(Catalog::from_ts(ts).is_err());
    }

    #[test]
    fn counts_statuses() {
        let stats = catalog().stats();
        assert_eq!(
            stats,
            Stats {
                contexts: 1,
                messages: 8,
                finished: 5,
                unfinished: 2,
                vanished: 1,
                obsolete: 0,
                numerus: 1,
            }
        );
    }

    #[test]
    fn language_drives_plural_rule() {
        let c = catalog();
        assert_eq!(c.language(), Some("he"));
        assert_eq!(c.source_language(), Some("en"));
        assert_eq!(c.plural_rule(), PluralRule::OneOther);
        assert_eq!(c.len(), 8);
        assert!(!c.is_empty());
    }

    #[test]
    fn write_and_reload_is_identical() {
        let c = catalog();
        let mut out = Vec::new();
        c.write(&mut out).unwrap();
        let reloaded = Catalog::from_reader(&out[..]).unwrap();
        assert_eq!(reloaded.document(), c.document());
    }

    #[test]
    fn length_variant_lookup_uses_longest() {
        let mut ts = Ts::new(None, Some("he".into()));
        let mut ctx = Context::new("UIVMInformationDialog");
        let mut translation = Translation::finished("");
        translation.variants = true;
        translation.body = TranslationBody::Text(TranslationText::LengthVariants(vec![
            "מידע על המחשב הווירטואלי".into(),
            "מידע".into(),
        ]));
        ctx.messages.push(message("Session Information", None, translation));
        ts.contexts.push(ctx);
        let c = Catalog::from_ts(ts).unwrap();
        assert_eq!(
            c.lookup("UIVMInformationDialog", "Session Information", None, None),
            Ok("מידע על המחשב הווירטואלי")
        );
    }

    #[test]
    fn catalog_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Catalog>();
    }
}
