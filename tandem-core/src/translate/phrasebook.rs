//! Static phrase tables
//!
//! Two tables back the non-network tiers: a phrase table consulted before
//! any remote call, and a smaller per-language-pair dictionary used as the
//! last resort when every remote tier failed.
//!
//! Lookup is case-insensitive. Within a pair, entries are scanned in order,
//! so longer phrases must precede their prefixes ("thank you very much"
//! before "thank you") and one-word entries go last.

struct PairPhrases {
    source: &'static str,
    target: &'static str,
    phrases: &'static [(&'static str, &'static str)],
}

static PHRASES: &[PairPhrases] = &[
    PairPhrases {
        source: "en",
        target: "es",
        phrases: &[
            ("thank you very much", "muchas gracias"),
            ("thank you", "gracias"),
            ("you're welcome", "de nada"),
            ("good morning", "buenos días"),
            ("good afternoon", "buenas tardes"),
            ("good night", "buenas noches"),
            ("see you later", "hasta luego"),
            ("how are you", "¿cómo estás?"),
            ("i don't understand", "no entiendo"),
            ("can you repeat that", "¿puedes repetir eso?"),
            ("nice to meet you", "mucho gusto"),
            ("where are you from", "¿de dónde eres?"),
            ("my name is", "me llamo"),
            ("excuse me", "disculpe"),
            ("goodbye", "adiós"),
            ("hello", "hola"),
            ("please", "por favor"),
            ("sorry", "lo siento"),
            ("yes", "sí"),
            ("no", "no"),
        ],
    },
    PairPhrases {
        source: "es",
        target: "en",
        phrases: &[
            ("muchas gracias", "thank you very much"),
            ("gracias", "thank you"),
            ("de nada", "you're welcome"),
            ("buenos días", "good morning"),
            ("buenas tardes", "good afternoon"),
            ("buenas noches", "good night"),
            ("hasta luego", "see you later"),
            ("cómo estás", "how are you"),
            ("no entiendo", "i don't understand"),
            ("mucho gusto", "nice to meet you"),
            ("me llamo", "my name is"),
            ("disculpe", "excuse me"),
            ("adiós", "goodbye"),
            ("hola", "hello"),
            ("por favor", "please"),
            ("lo siento", "sorry"),
            ("sí", "yes"),
        ],
    },
    PairPhrases {
        source: "en",
        target: "fr",
        phrases: &[
            ("thank you very much", "merci beaucoup"),
            ("thank you", "merci"),
            ("you're welcome", "de rien"),
            ("good morning", "bonjour"),
            ("good evening", "bonsoir"),
            ("good night", "bonne nuit"),
            ("see you later", "à plus tard"),
            ("how are you", "comment ça va ?"),
            ("i don't understand", "je ne comprends pas"),
            ("nice to meet you", "enchanté"),
            ("excuse me", "excusez-moi"),
            ("goodbye", "au revoir"),
            ("hello", "bonjour"),
            ("please", "s'il vous plaît"),
            ("sorry", "désolé"),
            ("yes", "oui"),
            ("no", "non"),
        ],
    },
    PairPhrases {
        source: "fr",
        target: "en",
        phrases: &[
            ("merci beaucoup", "thank you very much"),
            ("merci", "thank you"),
            ("de rien", "you're welcome"),
            ("bonsoir", "good evening"),
            ("bonne nuit", "good night"),
            ("bonjour", "hello"),
            ("à plus tard", "see you later"),
            ("comment ça va", "how are you"),
            ("je ne comprends pas", "i don't understand"),
            ("enchanté", "nice to meet you"),
            ("excusez-moi", "excuse me"),
            ("au revoir", "goodbye"),
            ("s'il vous plaît", "please"),
            ("désolé", "sorry"),
            ("oui", "yes"),
        ],
    },
];

static FALLBACK: &[PairPhrases] = &[
    PairPhrases {
        source: "en",
        target: "es",
        phrases: &[
            ("thank you", "gracias"),
            ("goodbye", "adiós"),
            ("hello", "hola"),
            ("please", "por favor"),
            ("yes", "sí"),
            ("no", "no"),
        ],
    },
    PairPhrases {
        source: "es",
        target: "en",
        phrases: &[
            ("gracias", "thank you"),
            ("adiós", "goodbye"),
            ("hola", "hello"),
            ("por favor", "please"),
            ("sí", "yes"),
        ],
    },
    PairPhrases {
        source: "en",
        target: "fr",
        phrases: &[
            ("thank you", "merci"),
            ("goodbye", "au revoir"),
            ("hello", "bonjour"),
            ("please", "s'il vous plaît"),
            ("yes", "oui"),
            ("no", "non"),
        ],
    },
    PairPhrases {
        source: "fr",
        target: "en",
        phrases: &[
            ("merci", "thank you"),
            ("au revoir", "goodbye"),
            ("bonjour", "hello"),
            ("s'il vous plaît", "please"),
            ("oui", "yes"),
            ("non", "no"),
        ],
    },
    PairPhrases {
        source: "en",
        target: "de",
        phrases: &[
            ("thank you", "danke"),
            ("goodbye", "auf wiedersehen"),
            ("hello", "hallo"),
            ("please", "bitte"),
            ("yes", "ja"),
            ("no", "nein"),
        ],
    },
    PairPhrases {
        source: "de",
        target: "en",
        phrases: &[
            ("auf wiedersehen", "goodbye"),
            ("danke", "thank you"),
            ("hallo", "hello"),
            ("bitte", "please"),
            ("ja", "yes"),
            ("nein", "no"),
        ],
    },
    PairPhrases {
        source: "en",
        target: "it",
        phrases: &[
            ("thank you", "grazie"),
            ("goodbye", "arrivederci"),
            ("hello", "ciao"),
            ("please", "per favore"),
            ("yes", "sì"),
            ("no", "no"),
        ],
    },
    PairPhrases {
        source: "it",
        target: "en",
        phrases: &[
            ("arrivederci", "goodbye"),
            ("per favore", "please"),
            ("grazie", "thank you"),
            ("ciao", "hello"),
            ("sì", "yes"),
        ],
    },
    PairPhrases {
        source: "en",
        target: "pt",
        phrases: &[
            ("thank you", "obrigado"),
            ("goodbye", "tchau"),
            ("hello", "olá"),
            ("please", "por favor"),
            ("yes", "sim"),
            ("no", "não"),
        ],
    },
    PairPhrases {
        source: "pt",
        target: "en",
        phrases: &[
            ("por favor", "please"),
            ("obrigado", "thank you"),
            ("tchau", "goodbye"),
            ("olá", "hello"),
            ("sim", "yes"),
            ("não", "no"),
        ],
    },
];

fn pair<'a>(table: &'a [PairPhrases], source: &str, target: &str) -> Option<&'a PairPhrases> {
    table
        .iter()
        .find(|p| p.source.eq_ignore_ascii_case(source) && p.target.eq_ignore_ascii_case(target))
}

/// Phrase-table lookup: case-insensitive exact match first, then the first
/// key contained in the input
pub(super) fn phrase_match(text: &str, source: &str, target: &str) -> Option<&'static str> {
    let pair = pair(PHRASES, source, target)?;
    let needle = text.trim().to_lowercase();

    if let Some((_, translation)) = pair.phrases.iter().find(|(key, _)| *key == needle) {
        return Some(translation);
    }
    pair.phrases
        .iter()
        .find(|(key, _)| needle.contains(key))
        .map(|(_, translation)| *translation)
}

/// Last-resort dictionary lookup: first key contained in the input
pub(super) fn fallback_match(text: &str, source: &str, target: &str) -> Option<&'static str> {
    let pair = pair(FALLBACK, source, target)?;
    let needle = text.trim().to_lowercase();

    pair.phrases
        .iter()
        .find(|(key, _)| needle.contains(key))
        .map(|(_, translation)| *translation)
}
