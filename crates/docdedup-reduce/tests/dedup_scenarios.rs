//! End-to-end deduplication scenarios over in-memory documents.
//!
//! Each test builds a small object graph, runs a full deduplication pass and
//! checks the surviving objects and the links between them.

use docdedup_reduce::{
    fingerprint, DedupConfig, DedupError, Deduplicator, Dictionary, Document, GcEngine, Object,
    ObjectStore, ObjectTable, Reference, Stream, StreamFilter,
};

fn count_where(doc: &Document, pred: impl Fn(&Object) -> bool) -> usize {
    doc.objects().iter().filter(|entry| pred(entry.1)).count()
}

/// Every reference held by a surviving object or the trailer resolves.
fn assert_no_dangling(doc: &Document) {
    fn walk(object: &Object, doc: &Document) {
        match object {
            Object::Reference(r) => assert!(doc.objects().get(*r).is_some(), "dangling {}", r),
            Object::Array(items) => items.iter().for_each(|i| walk(i, doc)),
            Object::Dictionary(d) => d.iter().for_each(|(_, v)| walk(v, doc)),
            Object::Stream(s) => s.dict.iter().for_each(|(_, v)| walk(v, doc)),
            _ => {}
        }
    }
    for (_, object) in doc.objects().iter() {
        walk(object, doc);
    }
    for (_, value) in doc.trailer().iter() {
        walk(value, doc);
    }
}

#[test]
fn test_empty_document() {
    let mut doc = Document::new();
    doc.deduplicate_objects(false).unwrap();
    assert_eq!(doc.object_count(), 0);
    doc.deduplicate_objects(true).unwrap();
    assert_eq!(doc.object_count(), 0);
}

#[test]
fn test_simple_integers() {
    let mut doc = Document::new();
    let first = doc.objects_mut().create_object(42).unwrap();
    doc.objects_mut().create_object(42).unwrap();
    doc.objects_mut().create_object(100).unwrap();

    doc.deduplicate_objects_default().unwrap();

    assert_eq!(doc.object_count(), 2);
    assert_eq!(count_where(&doc, |o| o.as_integer() == Some(42)), 1);
    assert_eq!(count_where(&doc, |o| o.as_integer() == Some(100)), 1);
    assert_eq!(doc.objects().get(first), Some(&Object::Integer(42)));
}

#[test]
fn test_strings() {
    let mut doc = Document::new();
    doc.objects_mut().create_object(Object::string("Hello")).unwrap();
    doc.objects_mut().create_object(Object::string("Hello")).unwrap();
    doc.objects_mut().create_object(Object::string("World")).unwrap();

    doc.deduplicate_objects(true).unwrap();

    assert_eq!(count_where(&doc, |o| *o == Object::string("Hello")), 1);
    assert_eq!(count_where(&doc, |o| *o == Object::string("World")), 1);
}

#[test]
fn test_arrays() {
    let mut doc = Document::new();
    let arr = || Object::Array(vec![Object::Integer(1), Object::Integer(2), Object::Integer(3)]);
    doc.objects_mut().create_object(arr()).unwrap();
    doc.objects_mut().create_object(arr()).unwrap();

    doc.deduplicate_objects(true).unwrap();

    assert_eq!(count_where(&doc, Object::is_array), 1);
    assert_eq!(doc.object_count(), 1);
}

#[test]
fn test_dictionaries() {
    let mut doc = Document::new();
    let dict = || {
        let mut d = Dictionary::new();
        d.insert("Key1", 100);
        d.insert("Key2", Object::string("Value"));
        Object::Dictionary(d)
    };
    doc.objects_mut().create_object(dict()).unwrap();
    doc.objects_mut().create_object(dict()).unwrap();

    doc.deduplicate_objects(true).unwrap();

    assert_eq!(count_where(&doc, Object::is_dictionary), 1);
}

#[test]
fn test_arrays_sharing_a_reference_merge() {
    let mut doc = Document::new();
    let target = doc.objects_mut().create_object(42).unwrap();
    let a1 = doc.objects_mut().create_object(Object::Array(vec![target.into()])).unwrap();
    let a2 = doc.objects_mut().create_object(Object::Array(vec![target.into()])).unwrap();

    let fp1 = fingerprint(doc.objects().get(a1).unwrap(), false).unwrap();
    let fp2 = fingerprint(doc.objects().get(a2).unwrap(), false).unwrap();
    assert_eq!(fp1, fp2);
    assert_eq!(fp1.to_string(), format!("array:[ref:{}:{}]", target.object, target.generation));

    doc.deduplicate_objects(false).unwrap();

    assert_eq!(doc.object_count(), 2);
    assert_eq!(count_where(&doc, Object::is_array), 1);
    assert!(doc.objects().get(a1).is_some());
    assert!(doc.objects().get(a2).is_none());
}

#[test]
fn test_nested_containers() {
    let mut doc = Document::new();
    let outer = || {
        let mut inner = Dictionary::new();
        inner.insert("inner", 123);
        Object::Array(vec![Object::Dictionary(inner), Object::Integer(456)])
    };
    doc.objects_mut().create_object(outer()).unwrap();
    doc.objects_mut().create_object(outer()).unwrap();

    doc.deduplicate_objects(true).unwrap();

    assert_eq!(count_where(&doc, |o| o.as_array().map(|a| a.len()) == Some(2)), 1);
}

#[test]
fn test_dictionary_order_sensitivity() {
    let mut doc = Document::new();
    let ab: Dictionary = [("A", 1), ("B", 2)].into_iter().collect();
    let ba: Dictionary = [("B", 2), ("A", 1)].into_iter().collect();
    doc.objects_mut().create_object(ab).unwrap();
    doc.objects_mut().create_object(ba).unwrap();

    doc.deduplicate_objects(true).unwrap();

    assert_eq!(count_where(&doc, Object::is_dictionary), 2);
}

#[test]
fn test_reference_entries_stay_separate() {
    let mut doc = Document::new();
    let elsewhere = doc.objects_mut().create_object(42).unwrap();
    let target = doc.objects_mut().create_object(42).unwrap();
    let a1 = doc
        .objects_mut()
        .create_object(Object::Array(vec![target.into(), Object::string("one")])).unwrap();
    let a2 = doc
        .objects_mut()
        .create_object(Object::Array(vec![target.into(), Object::string("two")])).unwrap();

    doc.deduplicate_objects(false).unwrap();

    assert!(doc.objects().get(target).is_none());
    let a1 = doc.objects().get(a1).and_then(Object::as_array).unwrap();
    let a2 = doc.objects().get(a2).and_then(Object::as_array).unwrap();
    assert_eq!(a1[0], Object::Reference(elsewhere));
    assert_eq!(a2[0], Object::Reference(elsewhere));
    assert_eq!(a1.len(), 2);
    assert_eq!(a2.len(), 2);
}

#[test]
fn test_aggressive_mode_compares_stream_bytes() {
    let build = || {
        let mut doc = Document::new();
        let dict: Dictionary = [("Length", 5)].into_iter().collect();
        doc.objects_mut()
            .create_object(Stream::with_data(dict.clone(), StreamFilter::Lz4, b"hello").unwrap()).unwrap();
        doc.objects_mut()
            .create_object(Stream::with_data(dict, StreamFilter::None, b"world").unwrap()).unwrap();
        doc
    };

    let mut aggressive = build();
    aggressive.deduplicate_objects(true).unwrap();
    assert_eq!(aggressive.object_count(), 2);

    let mut relaxed = build();
    relaxed.deduplicate_objects(false).unwrap();
    assert_eq!(relaxed.object_count(), 1);
}

#[test]
fn test_aggressive_mode_merges_equal_payloads_across_encodings() {
    let mut doc = Document::new();
    let dict: Dictionary = [("Length", 3)].into_iter().collect();
    doc.objects_mut()
        .create_object(Stream::with_data(dict.clone(), StreamFilter::Zstd { level: 3 }, b"abc").unwrap()).unwrap();
    doc.objects_mut()
        .create_object(Stream::with_data(dict, StreamFilter::Lz4, b"abc").unwrap()).unwrap();

    doc.deduplicate_objects(true).unwrap();

    assert_eq!(doc.object_count(), 1);
}

#[test]
fn test_gc_removes_unreachable_after_rewrite() {
    let mut doc = Document::new();
    let font_a = doc.objects_mut().create_object(Object::name("Helvetica")).unwrap();
    let font_b = doc.objects_mut().create_object(Object::name("Helvetica")).unwrap();
    let wrapper_b = doc.objects_mut().create_object(Object::Array(vec![font_b.into()])).unwrap();
    let orphan = doc.objects_mut().create_object(Object::string("unused")).unwrap();
    let mut catalog = Dictionary::new();
    catalog.insert("Fonts", Object::Array(vec![font_a.into(), wrapper_b.into()]));
    let catalog = doc.objects_mut().create_object(catalog).unwrap();
    doc.set_root(catalog);

    let report = doc.deduplicate_with_report(false).unwrap();

    assert_eq!(report.objects_merged, 1);
    assert_eq!(report.gc.objects_reclaimed, 1);
    assert!(doc.objects().get(orphan).is_none());
    assert!(doc.objects().get(font_b).is_none());
    assert_eq!(
        doc.objects().get(wrapper_b).and_then(Object::as_array).unwrap(),
        &[Object::Reference(font_a)]
    );
    assert_no_dangling(&doc);
}

#[test]
fn test_every_container_points_to_survivor() {
    let mut doc = Document::new();
    let mut refs = Vec::new();
    for _ in 0..4 {
        refs.push(doc.objects_mut().create_object(Object::Real(0.5)).unwrap());
    }
    let holders: Vec<Reference> = refs
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let mut d = Dictionary::new();
            d.insert("Index", i as i64);
            d.insert("Value", *r);
            doc.objects_mut().create_object(d).unwrap()
        })
        .collect();
    let root = doc
        .objects_mut()
        .create_object(Object::Array(holders.iter().map(|h| Object::Reference(*h)).collect())).unwrap();
    doc.set_root(root);

    doc.deduplicate_objects(false).unwrap();

    assert_eq!(count_where(&doc, |o| *o == Object::Real(0.5)), 1);
    for holder in holders {
        let dict = doc.objects().get(holder).and_then(Object::as_dictionary).unwrap();
        assert_eq!(dict.get("Value"), Some(&Object::Reference(refs[0])));
    }
    assert_no_dangling(&doc);
}

#[test]
fn test_idempotent_second_run() {
    let mut doc = Document::new();
    let leaf = doc.objects_mut().create_object(7).unwrap();
    doc.objects_mut().create_object(7).unwrap();
    let a = doc.objects_mut().create_object(Object::Array(vec![leaf.into()])).unwrap();
    doc.objects_mut().create_object(Object::Array(vec![leaf.into()])).unwrap();
    doc.set_root(a);

    doc.deduplicate_objects(true).unwrap();
    let after_first = doc.object_count();
    let report = doc.deduplicate_with_report(true).unwrap();

    assert_eq!(report.duplicate_groups, 0);
    assert_eq!(report.objects_merged, 0);
    assert_eq!(doc.object_count(), after_first);
}

#[test]
fn test_single_pass_leaves_newly_equal_containers() {
    let mut doc = Document::new();
    let x = doc.objects_mut().create_object(5).unwrap();
    let y = doc.objects_mut().create_object(5).unwrap();
    let a = doc.objects_mut().create_object(Object::Array(vec![x.into()])).unwrap();
    let b = doc.objects_mut().create_object(Object::Array(vec![y.into()])).unwrap();

    doc.deduplicate_objects(false).unwrap();
    assert_eq!(doc.object_count(), 3);
    assert_eq!(doc.objects().get(a), doc.objects().get(b));

    doc.deduplicate_objects(false).unwrap();
    assert_eq!(doc.object_count(), 2);
    assert!(doc.objects().get(b).is_none());
}

#[test]
fn test_cyclic_graph_terminates() {
    let mut doc = Document::new();
    let a = doc.objects_mut().reserve().unwrap();
    let mut b_dict = Dictionary::new();
    b_dict.insert("Parent", a);
    let b = doc.objects_mut().create_object(b_dict).unwrap();
    let mut a_dict = Dictionary::new();
    a_dict.insert("Kids", Object::Array(vec![b.into()]));
    doc.objects_mut().insert(a, a_dict).unwrap();
    let mut self_ref = Dictionary::new();
    self_ref.insert("Self", Reference::new(3, 0));
    assert_eq!(doc.objects_mut().create_object(self_ref).unwrap(), Reference::new(3, 0));
    doc.set_root(a);

    doc.deduplicate_objects(true).unwrap();

    assert_eq!(doc.object_count(), 2);
    assert_no_dangling(&doc);
}

#[test]
fn test_structural_objects_are_not_exempt() {
    let mut doc = Document::new();
    let unrelated = doc.objects_mut().create_object(Dictionary::new()).unwrap();
    let catalog = doc.objects_mut().create_object(Dictionary::new()).unwrap();
    doc.set_root(catalog);

    doc.deduplicate_objects(true).unwrap();

    assert_eq!(doc.root(), Some(unrelated));
    assert_eq!(doc.object_count(), 1);
}

#[test]
fn test_unclassified_objects_share_a_bucket() {
    let mut doc = Document::new();
    doc.objects_mut().create_object(Object::Opaque(b"<<garbled".to_vec())).unwrap();
    doc.objects_mut().create_object(Object::Opaque(b"%%other".to_vec())).unwrap();

    doc.deduplicate_objects(true).unwrap();

    assert_eq!(doc.object_count(), 1);
}

#[test]
fn test_stream_decode_failure_propagates_before_mutation() {
    let mut doc = Document::new();
    doc.objects_mut().create_object(42).unwrap();
    doc.objects_mut().create_object(42).unwrap();
    doc.objects_mut().create_object(Stream {
        dict: Dictionary::new(),
        filter: StreamFilter::Zstd { level: 3 },
        data: b"not zstd".to_vec(),
    }).unwrap();

    let err = doc.deduplicate_objects(true).unwrap_err();
    assert!(matches!(err, DedupError::StreamDecodeFailed(_)));
    assert_eq!(doc.object_count(), 3);

    doc.deduplicate_objects(false).unwrap();
    assert_eq!(doc.object_count(), 2);
}

/// Store whose removals always fail, to observe partial mutation.
struct NoRemoveStore {
    inner: ObjectTable,
}

impl ObjectStore for NoRemoveStore {
    fn enumerate(&self) -> Box<dyn Iterator<Item = (Reference, Option<&Object>)> + '_> {
        self.inner.enumerate()
    }

    fn get(&self, reference: Reference) -> Option<&Object> {
        self.inner.get(reference)
    }

    fn get_mut(&mut self, reference: Reference) -> Option<&mut Object> {
        self.inner.get_mut(reference)
    }

    fn remove(&mut self, reference: Reference) -> Result<Option<Object>, DedupError> {
        Err(DedupError::Store(format!("cannot remove {}", reference)))
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

#[test]
fn test_store_failure_leaves_rewrite_in_place() {
    let mut inner = ObjectTable::new();
    let keep = inner.create_object(1).unwrap();
    let dup = inner.create_object(1).unwrap();
    let holder = inner.create_object(Object::Array(vec![dup.into()])).unwrap();
    let mut store = NoRemoveStore { inner };

    let err = Deduplicator::new(DedupConfig::default())
        .run(&mut store, &mut Dictionary::new(), &mut GcEngine::default())
        .unwrap_err();

    assert!(matches!(err, DedupError::Store(_)));
    assert_eq!(store.len(), 3);
    assert_eq!(
        store.get(holder).and_then(Object::as_array).unwrap(),
        &[Object::Reference(keep)]
    );
}
