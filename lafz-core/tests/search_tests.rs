use lafz_core::{open_storage, Document, Storage};

// The first seventeen verses of the mushaf: al-Fatiha and the opening
// of al-Baqara.
const VERSES: [&str; 17] = [
    "بِسْمِ اللَّهِ الرَّحْمَـٰنِ الرَّحِيمِ",
    "الْحَمْدُ لِلَّهِ رَبِّ الْعَالَمِينَ",
    "الرَّحْمَـٰنِ الرَّحِيمِ",
    "مَالِكِ يَوْمِ الدِّينِ",
    "إِيَّاكَ نَعْبُدُ وَإِيَّاكَ نَسْتَعِينُ",
    "اهْدِنَا الصِّرَاطَ الْمُسْتَقِيمَ",
    "صِرَاطَ الَّذِينَ أَنْعَمْتَ عَلَيْهِمْ غَيْرِ الْمَغْضُوبِ عَلَيْهِمْ وَلَا الضَّالِّينَ",
    "الم",
    "ذَٰلِكَ الْكِتَابُ لَا رَيْبَ ۛ فِيهِ ۛ هُدًى لِّلْمُتَّقِينَ",
    "الَّذِينَ يُؤْمِنُونَ بِالْغَيْبِ وَيُقِيمُونَ الصَّلَاةَ وَمِمَّا رَزَقْنَاهُمْ يُنفِقُونَ",
    "وَالَّذِينَ يُؤْمِنُونَ بِمَا أُنزِلَ إِلَيْكَ وَمَا أُنزِلَ مِن قَبْلِكَ وَبِالْآخِرَةِ هُمْ يُوقِنُونَ",
    "أُولَـٰئِكَ عَلَىٰ هُدًى مِّن رَّبِّهِمْ ۖ وَأُولَـٰئِكَ هُمُ الْمُفْلِحُونَ",
    "إِنَّ الَّذِينَ كَفَرُوا سَوَاءٌ عَلَيْهِمْ أَأَنذَرْتَهُمْ أَمْ لَمْ تُنذِرْهُمْ لَا يُؤْمِنُونَ",
    "خَتَمَ اللَّهُ عَلَىٰ قُلُوبِهِمْ وَعَلَىٰ سَمْعِهِمْ ۖ وَعَلَىٰ أَبْصَارِهِمْ غِشَاوَةٌ ۖ وَلَهُمْ عَذَابٌ عَظِيمٌ",
    "وَمِنَ النَّاسِ مَن يَقُولُ آمَنَّا بِاللَّهِ وَبِالْيَوْمِ الْآخِرِ وَمَا هُم بِمُؤْمِنِينَ",
    "يُخَادِعُونَ اللَّهَ وَالَّذِينَ آمَنُوا وَمَا يَخْدَعُونَ إِلَّا أَنفُسَهُمْ وَمَا يَشْعُرُونَ",
    "فِي قُلُوبِهِم مَّرَضٌ فَزَادَهُمُ اللَّهُ مَرَضًا ۖ وَلَهُمْ عَذَابٌ أَلِيمٌ بِمَا كَانُوا يَكْذِبُونَ",
];

fn indexed_storage(dir: &std::path::Path) -> Storage {
    let mut storage = open_storage(dir).unwrap();
    let documents: Vec<Document> = VERSES
        .iter()
        .enumerate()
        .map(|(i, arabic)| Document {
            identifier: (i + 1).to_string(),
            arabic: arabic.to_string(),
        })
        .collect();
    storage.add_documents(&documents).unwrap();
    storage
}

fn found_ids(storage: &Storage, query: &str) -> Vec<String> {
    storage
        .search(query)
        .unwrap()
        .into_iter()
        .map(|r| r.identifier)
        .collect()
}

#[test]
fn transliteration_queries_find_their_verses() {
    let dir = tempfile::tempdir().unwrap();
    let storage = indexed_storage(dir.path());

    let cases: [(&str, &[&str]); 7] = [
        ("bismi", &["1"]),
        ("alhamdulillah", &["2"]),
        ("rahman", &["1", "3"]),
        ("yaumiddin", &["4"]),
        ("bismillahirrahmanirrahim", &["1"]),
        // Wrong transliteration still matches ad-dallin.
        ("dooollliiin", &["7"]),
        // Not present in the corpus at all.
        ("istigfar", &[]),
    ];
    for (query, expected) in cases {
        assert_eq!(found_ids(&storage, query), expected, "query {:?}", query);
    }
}

#[test]
fn results_are_ranked_and_tie_broken_by_identifier() {
    let dir = tempfile::tempdir().unwrap();
    let storage = indexed_storage(dir.path());

    let results = storage.search("rahman").unwrap();
    assert_eq!(results.len(), 2);
    for pair in results.windows(2) {
        assert!(
            pair[0].confidence > pair[1].confidence
                || (pair[0].confidence == pair[1].confidence
                    && pair[0].identifier < pair[1].identifier)
        );
    }
}

#[test]
fn full_phrase_query_reports_high_confidence() {
    let dir = tempfile::tempdir().unwrap();
    let storage = indexed_storage(dir.path());

    let results = storage.search("bismillahirrahmanirrahim").unwrap();
    assert_eq!(results.len(), 1);
    let top = &results[0];
    assert_eq!(top.identifier, "1");
    assert_eq!(top.text, VERSES[0]);
    assert!(top.confidence > 0.7, "confidence {}", top.confidence);
    assert!(!top.positions.is_empty());
}

#[test]
fn match_spans_point_at_the_matched_word() {
    let dir = tempfile::tempdir().unwrap();
    let storage = indexed_storage(dir.path());

    let results = storage.search("bismi").unwrap();
    assert_eq!(results.len(), 1);
    // The span covers the opening word of the basmala.
    assert_eq!(results[0].positions, vec![(0, 5)]);
}

#[test]
fn substring_of_indexed_text_is_found() {
    let dir = tempfile::tempdir().unwrap();
    let storage = indexed_storage(dir.path());

    // Direct substrings of a verse's phonetic stream come back with
    // confidence at or above the floor.
    for query in ["alhamdu", "mustakim", "nastain"] {
        let results = storage.search(query).unwrap();
        assert!(!results.is_empty(), "query {:?} found nothing", query);
        assert!(results[0].confidence >= storage.min_confidence());
    }
}

#[test]
fn raising_the_floor_hides_partial_matches() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = indexed_storage(dir.path());

    let default_hits = found_ids(&storage, "bismillahirrahmanirrahim");
    assert_eq!(default_hits, ["1"]);

    storage.set_min_confidence(1.0);
    assert!(found_ids(&storage, "bismillahirrahmanirrahim").is_empty());
    // Exact-coverage queries still pass a floor of 1.
    assert_eq!(found_ids(&storage, "rahman"), ["1", "3"]);
}

#[test]
fn upsert_and_delete_are_visible_to_search() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = indexed_storage(dir.path());

    storage
        .add_documents(&[Document {
            identifier: "1".to_string(),
            arabic: VERSES[3].to_string(),
        }])
        .unwrap();
    // Document 1 is now the fourth verse; the basmala phrase no
    // longer matches it.
    assert!(found_ids(&storage, "bismillahirrahmanirrahim").is_empty());
    assert_eq!(found_ids(&storage, "yaumiddin"), ["1", "4"]);

    storage.delete_documents(&["1".to_string()]).unwrap();
    assert_eq!(found_ids(&storage, "yaumiddin"), ["4"]);
}

#[test]
fn index_survives_reopening() {
    let dir = tempfile::tempdir().unwrap();
    {
        let storage = indexed_storage(dir.path());
        storage.close();
    }
    let storage = open_storage(dir.path()).unwrap();
    assert_eq!(storage.document_count(), 17);
    assert_eq!(found_ids(&storage, "alhamdulillah"), ["2"]);
}

#[test]
fn edit_script_scorer_agrees_on_clear_matches() {
    let dir = tempfile::tempdir().unwrap();
    let storage = indexed_storage(dir.path());

    let results = storage.search_edit_script("bismillahirrahmanirrahim").unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].identifier, "1");
    assert!(results[0].confidence > 0.9);
    assert_eq!(results[0].positions.len(), 1);

    assert!(storage.search_edit_script("istigfar").unwrap().is_empty());
    assert!(storage.search_edit_script("").unwrap().is_empty());
}
