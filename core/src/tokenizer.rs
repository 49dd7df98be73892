use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref PUNCTUATION: Regex = Regex::new(r"[\p{P}\p{S}]").expect("valid regex");
    static ref STOPWORDS: HashSet<&'static str> = {
        // Contractions are listed in their punctuation-stripped form.
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","arent","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","cannot","cant","could","couldnt",
            "did","didnt","do","does","doesnt","doing","dont","down","during",
            "each","few","for","from","further",
            "had","hadnt","has","hasnt","have","havent","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","im","in","into","is","isnt","it","its","itself",
            "me","more","most","mustnt","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","should","shouldnt","so","some","such",
            "than","that","thats","the","their","theirs","them","themselves","then","there","these","they","theyre","this","those","through","to","too",
            "under","until","up","very",
            "was","wasnt","we","were","werent","what","when","where","which","while","who","whom","why","will","with","wont","would","wouldnt",
            "you","youre","youve","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Tokenize text into index terms: NFKC normalization, lowercase, punctuation and
/// symbol stripping, whitespace split, stopword removal.
///
/// Punctuation is removed rather than treated as a separator, so "t-shirt" yields
/// "tshirt". The position of a term is its index in the returned vector.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let stripped = PUNCTUATION.replace_all(&normalized, "");
    stripped
        .split_whitespace()
        .filter(|token| !is_stopword(token))
        .map(str::to_string)
        .collect()
}

/// Canonical form of a multi-word value ("United  States" -> "united states"),
/// used for brand/origin keys and synonym entries.
pub fn normalize_phrase(text: &str) -> String {
    tokenize(text).join(" ")
}
