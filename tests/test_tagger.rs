use std::{io::Cursor, path::Path};

use crftagger::{ConllReader, ConllWriter, Fields, Lbfgs, LbfgsParams, Sentence, Tagger};

const TRAIN: &str = "\
the DT B-NP
dog NN I-NP
barks VBZ B-VP

a DT B-NP
cat NN I-NP
sleeps VBZ B-VP

the DT B-NP
cat NN I-NP
barks VBZ B-VP

dogs NNS B-NP
sleep VBP B-VP
";

fn train(dir: &Path) {
    let mut cfg = Tagger::config();
    let args = ["--model", dir.to_str().unwrap(), "--train-c2", "0.01", "--train-max-iterations", "500"];
    assert!(cfg.process(&args, &mut Vec::new()).unwrap());

    let mut tagger = Tagger::new(&cfg).unwrap();
    let mut reader = ConllReader::new("train", Cursor::new(TRAIN), Fields::default());
    let mut lbfgs = Lbfgs::new(LbfgsParams::from_config(&cfg).unwrap());
    tagger.train(&mut reader, &mut lbfgs).unwrap();
    assert_eq!(tagger.weights().len(), tagger.attributes().len());
}

#[test]
fn trained_model_reproduces_training_labels() {
    let dir = tempfile::tempdir().unwrap();
    train(dir.path());
    for file in ["lexicon", "pos", "tags", "attributes", "model.json"] {
        assert!(dir.path().join(file).exists(), "{file}");
    }

    let tagger = Tagger::load(dir.path()).unwrap();
    assert_eq!(tagger.tags().len(), 3);
    assert_eq!(tagger.max_size(), 3);

    let mut reader = ConllReader::new("train", Cursor::new(TRAIN), Fields::default());
    let mut eval = tagger.evaluate(&mut reader).unwrap();
    let est = eval.evaluate();
    assert_eq!(est.item_accuracy, 1.0);
    assert_eq!(est.inst_accuracy, 1.0);
    assert!(eval.to_string().contains("Item accuracy: 11/11 => 1.0000"));
}

#[test]
fn run_tag_appends_a_label_column() {
    let dir = tempfile::tempdir().unwrap();
    train(dir.path());
    let tagger = Tagger::load(dir.path()).unwrap();

    let fields = Fields::WORDS | Fields::POS;
    let mut reader = ConllReader::new("in", Cursor::new("the DT\ncat NN\nsleeps VBZ\n\na DT\ndog NN\nbarks VBZ\n"), fields);
    let mut writer = ConllWriter::new("out", Vec::new(), fields);
    assert_eq!(tagger.run_tag(&mut reader, &mut writer).unwrap(), 2);

    let out = String::from_utf8(writer.into_inner()).unwrap();
    assert_eq!(out, "the DT B-NP\ncat NN I-NP\nsleeps VBZ B-VP\n\na DT B-NP\ndog NN I-NP\nbarks VBZ B-VP\n\n");
}

#[test]
fn unknown_words_still_get_one_label_each() {
    let dir = tempfile::tempdir().unwrap();
    train(dir.path());
    let tagger = Tagger::load(dir.path()).unwrap();

    let mut sent = Sentence::default();
    for (w, p) in [("zebras", "NNS"), ("gallop", "VBP"), ("wildly", "RB"), ("today", "NN")] {
        sent.push(w, p, None);
    }
    let mut state = tagger.state();
    let score = tagger.tag(&mut state, &mut sent).unwrap();
    assert!(score.is_finite());
    assert_eq!(sent.labels.len(), 4);
    assert!(sent.labels.iter().all(|l| ["B-NP", "I-NP", "B-VP"].contains(&l.as_str())));
}

#[test]
fn tagging_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    train(dir.path());
    let tagger = Tagger::load(dir.path()).unwrap();

    let mut state = tagger.state();
    let mut a = Sentence::default();
    for (w, p) in [("a", "DT"), ("dog", "NN"), ("barks", "VBZ")] {
        a.push(w, p, None);
    }
    let mut b = a.clone();
    let sa = tagger.tag(&mut state, &mut a).unwrap();
    let sb = tagger.tag(&mut state, &mut b).unwrap();
    assert_eq!(sa, sb);
    assert_eq!(a.labels, b.labels);
}

#[test]
fn missing_model_directory_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Tagger::load(dir.path().join("nope")).is_err());
}

#[test]
fn run_tag_streams_unseekable_input() {
    let dir = tempfile::tempdir().unwrap();
    train(dir.path());
    let tagger = Tagger::load(dir.path()).unwrap();

    let fields = Fields::WORDS | Fields::POS;
    let input: &[u8] = b"the DT\ndog NN\nbarks VBZ\n";
    let mut reader = ConllReader::new("<stdin>", input, fields);
    let mut writer = ConllWriter::new("<stdout>", Vec::new(), fields);
    assert_eq!(tagger.run_tag(&mut reader, &mut writer).unwrap(), 1);
    assert_eq!(String::from_utf8(writer.into_inner()).unwrap(), "the DT B-NP\ndog NN I-NP\nbarks VBZ B-VP\n\n");
}
