use approx::assert_relative_eq;
use skypulse_track::{Detection, Rect, TrackManager, TrackState};

fn car(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
    Detection::new(x1, y1, x2, y2, 0.9, 2, "car")
}

#[test]
fn test_new_track_from_single_detection() {
    let mut tracker = TrackManager::default();

    let tracks = tracker.update(&[car(100.0, 100.0, 300.0, 200.0)], 720);
    assert_eq!(tracks.len(), 1);

    let track = &tracks[0];
    assert_eq!(track.age, 0);
    assert_eq!(track.missed_frames, 0);
    assert_eq!(track.velocity, (0.0, 0.0));
    assert_eq!(track.state, TrackState::New);
    assert_eq!(track.class_name, "car");

    // size: 4.5 * 800 / 200 * 1.1 = 19.8, position: 200 / 720 -> 20.0 band
    assert_relative_eq!(track.distance, 0.7 * 19.8 + 0.3 * 20.0, epsilon = 1e-4);
    assert_relative_eq!(track.distance, 19.86, epsilon = 1e-4);
}

#[test]
fn test_matched_track_keeps_identity() {
    let mut tracker = TrackManager::default();

    let tracks1 = tracker.update(&[car(100.0, 100.0, 200.0, 200.0)], 720);
    let id1 = tracks1[0].id;

    // Same object moved slightly
    let tracks2 = tracker.update(&[car(105.0, 103.0, 205.0, 203.0)], 720);
    assert_eq!(tracks2.len(), 1);
    assert_eq!(tracks2[0].id, id1);
    assert_eq!(tracks2[0].age, 1);
    assert_eq!(tracks2[0].missed_frames, 0);
    assert_eq!(tracks2[0].state, TrackState::Tracked);
}

#[test]
fn test_track_destroyed_after_eleven_misses() {
    let mut tracker = TrackManager::default();
    let id = tracker.update(&[car(100.0, 100.0, 200.0, 200.0)], 720)[0].id;

    for call in 1..=10 {
        let tracks = tracker.update(&[], 720);
        assert_eq!(tracks.len(), 1, "track should coast on call {call}");
        assert_eq!(tracks[0].id, id);
        assert_eq!(tracks[0].missed_frames, call);
        assert_eq!(tracks[0].age, 0);
        assert_eq!(tracks[0].state, TrackState::Coasting);
    }

    let tracks = tracker.update(&[], 720);
    assert!(tracks.is_empty());
    assert!(tracker.get(id).is_none());

    // A later detection in the same place starts a new identity.
    let tracks = tracker.update(&[car(100.0, 100.0, 200.0, 200.0)], 720);
    assert_eq!(tracks.len(), 1);
    assert_ne!(tracks[0].id, id);
    assert_eq!(tracks[0].age, 0);
}

#[test]
fn test_match_resets_missed_frames() {
    let mut tracker = TrackManager::default();
    let id = tracker.update(&[car(100.0, 100.0, 200.0, 200.0)], 720)[0].id;

    for _ in 0..5 {
        tracker.update(&[], 720);
    }
    assert_eq!(tracker.get(id).unwrap().missed_frames, 5);

    let tracks = tracker.update(&[car(101.0, 100.0, 201.0, 200.0)], 720);
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].id, id);
    assert_eq!(tracks[0].missed_frames, 0);
    assert_eq!(tracks[0].age, 1);
}

#[test]
fn test_assignment_is_globally_optimal() {
    let mut tracker = TrackManager::default();

    // Two tracks: A at x 100..200, B at x 150..250
    let tracks = tracker.update(
        &[car(100.0, 0.0, 200.0, 100.0), car(150.0, 0.0, 250.0, 100.0)],
        720,
    );
    let id_a = tracks.iter().find(|t| t.bbox.x1 == 100.0).unwrap().id;
    let id_b = tracks.iter().find(|t| t.bbox.x1 == 150.0).unwrap().id;

    // IoU(A, d1) = 0.667, IoU(A, d2) = 0.429, IoU(B, d1) = 0.538, IoU(B, d2) = 0.053.
    // Greedy would pair A with d1 and strand B; the optimum is A-d2 plus B-d1.
    let d1 = car(120.0, 0.0, 220.0, 100.0);
    let d2 = car(60.0, 0.0, 160.0, 100.0);
    let tracks = tracker.update(&[d1.clone(), d2.clone()], 720);

    assert_eq!(tracks.len(), 2);
    let a = tracker.get(id_a).unwrap();
    let b = tracker.get(id_b).unwrap();
    assert_eq!(a.bbox, d2.bbox);
    assert_eq!(b.bbox, d1.bbox);
    assert_eq!((a.age, b.age), (1, 1));
}

#[test]
fn test_distance_is_fused_only_at_birth() {
    let mut tracker = TrackManager::default();
    let birth = tracker.update(&[car(100.0, 100.0, 300.0, 200.0)], 720)[0].clone();

    // The object comes much closer (larger, lower in frame), but the distance
    // is not re-estimated for an existing track.
    let mut boxes = Vec::new();
    for step in 1..=20 {
        let grow = 5.0 * step as f32;
        boxes.push(car(100.0 - grow, 100.0, 300.0 + grow, 200.0 + 2.0 * grow));
    }
    for det in &boxes {
        let tracks = tracker.update(std::slice::from_ref(det), 720);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, birth.id);
        assert_eq!(tracks[0].distance, birth.distance);
    }
}

#[test]
fn test_coasting_track_keeps_last_matched_box() {
    let mut tracker = TrackManager::default();
    for step in 0..10 {
        let x = 10.0 * step as f32;
        tracker.update(&[car(x, 100.0, x + 100.0, 200.0)], 720);
    }
    let before = tracker.tracks().next().unwrap().clone();
    assert!(before.velocity.0 > 5.0);
    assert_eq!(before.bbox, Rect::from_tlbr(90.0, 100.0, 190.0, 200.0));

    let tracks = tracker.update(&[], 720);
    let coasting = &tracks[0];
    assert_eq!(coasting.state, TrackState::Coasting);
    assert_eq!(coasting.bbox, Rect::from_tlbr(90.0, 100.0, 190.0, 200.0));
    // The filter still extrapolates along the velocity.
    assert!(coasting.estimated_bbox().x1 > before.estimated_bbox().x1);
    assert!(coasting.estimated_bbox().x1 > coasting.bbox.x1);
}

#[test]
fn test_identities_are_unique() {
    let mut tracker = TrackManager::default();
    let mut seen = std::collections::HashSet::new();

    for frame in 0..30 {
        // Every frame brings one far-away object that matches nothing.
        let x = 400.0 * frame as f32;
        let tracks = tracker.update(&[car(x, 0.0, x + 50.0, 50.0)], 720);
        for track in tracks.iter().filter(|t| t.state == TrackState::New) {
            assert!(seen.insert(track.id), "identity {} reused", track.id);
        }
        assert!(tracks.len() <= 11);
    }
    assert_eq!(seen.len(), 30);
}

#[test]
fn test_iou_properties() {
    let a = Rect::from_tlbr(10.0, 10.0, 60.0, 90.0);
    let b = Rect::from_tlbr(30.0, 40.0, 100.0, 120.0);
    let far = Rect::from_tlbr(200.0, 200.0, 260.0, 260.0);

    assert_relative_eq!(a.iou(&a), 1.0);
    assert_eq!(a.iou(&b), b.iou(&a));
    assert_eq!(a.iou(&far), 0.0);
}
