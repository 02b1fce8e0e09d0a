use std::{fs, io::Cursor, path::Path};

use crftagger::{ConllReader, Config, Contexts, Fields, Tag, TagPair, Tagger};

const CORPUS: &str = "\
Confidence NN B-NP
in IN B-PP
the DT B-NP
pound NN I-NP

Chancellor NNP B-NP
rejected VBD B-VP
the DT B-NP
deficit NN I-NP
figures NNS I-NP

the DT B-NP
pound NN I-NP
rose VBD B-VP
";

fn config(dir: &Path) -> Config {
    let mut cfg = Tagger::config();
    let args = ["--model", dir.to_str().unwrap(), "--types-pos-bigrams", "false", "--preface", "# test"];
    assert!(cfg.process(&args, &mut Vec::new()).unwrap());
    cfg
}

fn reader() -> ConllReader<Cursor<&'static str>> {
    ConllReader::new("corpus", Cursor::new(CORPUS), Fields::default())
}

#[test]
fn three_passes_yield_one_context_per_token() {
    let dir = tempfile::tempdir().unwrap();
    let mut tagger = Tagger::new(&config(dir.path())).unwrap();
    let instances = tagger.extract(&mut reader()).unwrap();

    assert_eq!(instances.len(), 3);
    assert_eq!(instances.num_tags, 4);
    assert_eq!(instances.num_attributes(), tagger.attributes().len());
    let lens: Vec<usize> = instances.sentences.iter().map(Contexts::len).collect();
    assert_eq!(lens, [4, 5, 3]);

    let num_attributes = tagger.attributes().len();
    for seq in &instances.sentences {
        for ctx in seq.positions() {
            assert!(ctx.features.iter().all(|&a| (a as usize) < num_attributes));
        }
        assert_eq!(seq.items[0].label.prev, Tag::SENTINEL);
        assert_eq!(seq.exit.label.curr, Tag::SENTINEL);
    }

    let np = tagger.tags().canonize("B-NP").unwrap();
    let inp = tagger.tags().canonize("I-NP").unwrap();
    assert_eq!(instances.sentences[2].items[1].label, TagPair::new(np, inp));

    let attributes = fs::read_to_string(dir.path().join("attributes")).unwrap();
    assert!(attributes.starts_with("# test\n"));
    assert_eq!(attributes.lines().count(), num_attributes + 1);
}

#[test]
fn extraction_is_reproducible() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let mut first = Tagger::new(&config(a.path())).unwrap();
    let mut second = Tagger::new(&config(b.path())).unwrap();
    let ia = first.extract(&mut reader()).unwrap();
    let ib = second.extract(&mut reader()).unwrap();

    assert_eq!(ia.sentences, ib.sentences);
    assert_eq!(ia.pairs, ib.pairs);
    for file in ["lexicon", "pos", "tags", "attributes"] {
        let x = fs::read_to_string(a.path().join(file)).unwrap();
        let y = fs::read_to_string(b.path().join(file)).unwrap();
        assert_eq!(x, y, "{file}");
    }
}

#[test]
fn passes_are_rerunnable() {
    let dir = tempfile::tempdir().unwrap();
    let mut tagger = Tagger::new(&config(dir.path())).unwrap();
    let mut reader = reader();
    let first = tagger.extract(&mut reader).unwrap();
    let second = tagger.extract(&mut reader).unwrap();
    assert_eq!(first.sentences, second.sentences);
    assert_eq!(tagger.lexicon().freq("the"), 3);
}

#[test]
fn ragged_corpus_aborts_the_pass() {
    let dir = tempfile::tempdir().unwrap();
    let mut tagger = Tagger::new(&config(dir.path())).unwrap();
    let mut reader = ConllReader::new("corpus", Cursor::new("the DT B-NP\npound NN\n"), Fields::default());
    assert!(tagger.extract(&mut reader).is_err());
}
