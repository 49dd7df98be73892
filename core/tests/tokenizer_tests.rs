use shopsearch_core::tokenizer::tokenize;

#[test]
fn it_lowercases_and_strips_punctuation() {
    let words = tokenize("Black Cotton T-Shirt, size: L!");
    assert_eq!(words, vec!["black", "cotton", "tshirt", "size", "l"]);
}

#[test]
fn it_normalizes_unicode() {
    // NFKC folds the ligature and full-width forms
    let words = tokenize("ﬁne ＡＢＣ");
    assert_eq!(words, vec!["fine", "abc"]);
}

#[test]
fn it_filters_stopwords() {
    let words = tokenize("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert_eq!(words, vec!["quick", "brown", "fox", "lazy", "dog"]);
}

#[test]
fn it_is_idempotent() {
    let samples = [
        "Reusable Stainless-Steel Water Bottle (750ml) -- BPA free!",
        "Box of Chocolate Candy: 12 pieces & a card",
        "Café crème, naïve façade; über-cool €5 deal",
        "",
        "   ...   ",
    ];
    for s in samples {
        let once = tokenize(s);
        let twice = tokenize(&once.join(" "));
        assert_eq!(once, twice, "not idempotent for {s:?}");
    }
}

#[test]
fn it_is_deterministic() {
    let text = "Gaming Laptop with RGB Keyboard";
    assert_eq!(tokenize(text), tokenize(text));
}
