use std::fs;

use bodyslide_rs::{
    apply_sliders, DiffDataSets, SliderData, SliderSet, SliderSetFile, SliderValue,
};
use glam::{vec3, Vec3};

const LEGACY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SliderSetInfo>
	<SliderSet name="Old Outfit">
		<SetFolder>OldOutfit</SetFolder>
		<SourceFile>OldOutfit.nif</SourceFile>
		<OutputPath>meshes\armor\old</OutputPath>
		<OutputFile>old</OutputFile>
		<BaseShapeName target="BaseShape">Body</BaseShapeName>
		<Slider name="Breasts" invert="false" small="0" big="100">
			<Data name="BaseShapeBreasts" target="BaseShape">BaseShape.osd\BaseShapeBreasts</Data>
		</Slider>
	</SliderSet>
</SliderSetInfo>"#;

fn init() {
    let _ = env_logger::try_init();
}

fn bust_set() -> SliderSet {
    let mut set = SliderSet::new("Outfit");
    set.data_folder = "Outfit".to_owned();
    set.input_file = "Outfit.nif".to_owned();
    set.output_path = "meshes\\outfit".to_owned();
    set.output_file = "outfit".to_owned();
    set.set_shape_data_folders("Body", vec!["Body".to_owned()]);

    let bust = set.create_slider("Bust");
    set.sliders[bust].def_big_value = 100.0;
    set.sliders[bust].add_data_file("Body", "Bust", "Bust.osd/Bust", false);
    set
}

#[test]
fn write_then_load_keeps_sliders_with_data() {
    init();
    let mut set = bust_set();
    set.gen_weights = false;
    set.prevent_morph_file = true;

    let zap = set.create_slider("NoHands");
    set.sliders[zap].flags.set_zap(true);
    set.sliders[zap].flags.set_hidden(true);
    set.sliders[zap].zap_toggles = vec!["Bust".to_owned()];
    set.sliders[zap].add_data_file("Body", "NoHands", "Body.osd/NoHands", true);

    // No data, so it won't be written.
    set.create_slider("Empty");

    let shape = set.shape_attributes.get_mut("Body").unwrap();
    shape.target_shape = Some("BaseShape".to_owned());
    shape.smooth_seam_normals_angle = 45.0;

    let loaded = SliderSet::from_element(&set.to_element()).unwrap();

    assert_eq!(loaded.name, set.name);
    assert_eq!(loaded.data_folder, set.data_folder);
    assert_eq!(loaded.input_file, set.input_file);
    assert_eq!(loaded.output_path, bodyslide_rs::path::to_os_slashes(&set.output_path));
    assert_eq!(loaded.output_file, set.output_file);
    assert!(!loaded.gen_weights());
    assert!(loaded.prevent_morph_file());
    assert_eq!(loaded.shape_attributes, set.shape_attributes);

    let kept: Vec<&SliderData> = set.sliders.iter().filter(|s| !s.data_files.is_empty()).collect();
    assert_eq!(loaded.len(), kept.len());
    for (loaded, original) in loaded.sliders.iter().zip(kept) {
        assert_eq!(loaded.name, original.name);
        assert_eq!(loaded.flags, original.flags);
        assert_eq!(loaded.def_big_value, original.def_big_value);
        assert_eq!(loaded.zap_toggles, original.zap_toggles);
        assert_eq!(loaded.data_files.len(), original.data_files.len());
        for (a, b) in loaded.data_files.iter().zip(&original.data_files) {
            assert_eq!(a.target_name, b.target_name);
            assert_eq!(a.data_name, b.data_name);
            assert_eq!(a.local, b.local);
            assert_eq!(a.file_name, bodyslide_rs::path::to_os_slashes(&b.file_name));
        }
    }
    assert!(!loaded.slider_exists("Empty"));
}

#[test]
fn legacy_files_load_and_save_current() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Old.osp");
    fs::write(&path, LEGACY).unwrap();

    let mut file = SliderSetFile::open(&path).unwrap();
    assert_eq!(file.version(), 0);

    let set = file.get_set("Old Outfit").unwrap();
    assert_eq!(set.data_folder, "OldOutfit");
    assert_eq!(set.target_to_shape("BaseShape"), Some("Body"));
    assert_eq!(set.shape_data_folders("Body"), ["OldOutfit"]);
    assert_eq!(set.len(), 1);

    file.save().unwrap();
    assert_eq!(file.version(), 1);

    let bytes = fs::read(&path).unwrap();
    assert!(bytes.starts_with(&[0xEF, 0xBB, 0xBF]));
    let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
    assert!(text.starts_with("<?xml"));
    assert!(text.contains("<DataFolder>OldOutfit</DataFolder>"));
    assert!(!text.contains("SetFolder"));
    assert!(!text.contains("BaseShapeName"));

    let reopened = SliderSetFile::open(&path).unwrap();
    assert_eq!(reopened.version(), 1);
    assert_eq!(reopened.get_set("Old Outfit").unwrap().data_folder, "OldOutfit");
}

#[test]
fn new_file_round_trips_through_disk() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("New.osp");

    let mut file = SliderSetFile::new(&path);
    file.update_set(&bust_set());
    file.save().unwrap();

    let reopened = SliderSetFile::open(&path).unwrap();
    assert_eq!(reopened.set_names(), vec!["Outfit"]);
    let set = reopened.get_set("Outfit").unwrap();
    assert_eq!(set.slider("Bust").unwrap().data_files.len(), 1);
    assert_eq!(
        reopened.set_output_file_path("Outfit"),
        Some(set.output_file_path())
    );
}

#[test]
fn bust_at_half_adds_half_the_offset() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let body = dir.path().join("Body");
    fs::create_dir_all(&body).unwrap();

    let mut authored = DiffDataSets::new();
    authored.insert(
        "Bust",
        "Body",
        [(0, vec3(0.0, 2.0, 1.0)), (2, vec3(4.0, 0.0, -2.0))]
            .into_iter()
            .collect(),
    );
    authored.save_data(["Bust"], &body.join("Bust.osd")).unwrap();

    let mut set = bust_set();
    set.set_base_data_path(dir.path());

    let mut store = DiffDataSets::new();
    set.load_set_diff_data(&mut store, None);
    assert!(store.contains("Bust"));

    let values = [SliderValue::from_slider(set.slider("Bust").unwrap(), 0.5)];
    let mut verts = vec![Vec3::ONE; 3];
    let mut zapped = Vec::new();
    apply_sliders(&store, "Body", &values, &mut verts, &mut zapped, None);

    assert_eq!(verts[0], vec3(1.0, 2.0, 1.5));
    assert_eq!(verts[1], Vec3::ONE);
    assert_eq!(verts[2], vec3(3.0, 1.0, 0.0));
    assert!(zapped.is_empty());
}

#[test]
fn second_folder_is_used_when_first_lacks_the_file() {
    init();
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("F1")).unwrap();
    fs::create_dir_all(dir.path().join("F2")).unwrap();

    let mut authored = DiffDataSets::new();
    authored.insert("Bust", "Body", [(0, Vec3::X)].into_iter().collect());
    authored
        .save_set("Bust", "Body", &dir.path().join("F2").join("Bust.bsd"))
        .unwrap();

    let mut set = SliderSet::new("Outfit");
    set.set_base_data_path(dir.path());
    set.set_shape_data_folders("Body", vec!["F1".to_owned(), "F2".to_owned()]);
    let bust = set.create_slider("Bust");
    set.sliders[bust].add_data_file("Body", "Bust", "Bust.bsd", false);
    let missing = set.create_slider("Belly");
    set.sliders[missing].add_data_file("Body", "Belly", "Belly.bsd", false);

    let mut store = DiffDataSets::new();
    set.load_set_diff_data(&mut store, None);

    assert!(store.target_match("Bust", "Body").is_some());
    assert!(!store.contains("Belly"));
}

#[test]
fn shape_filter_and_orphans() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let body = dir.path().join("Body");
    let hands = dir.path().join("Hands");
    fs::create_dir_all(&body).unwrap();
    fs::create_dir_all(&hands).unwrap();

    let mut authored = DiffDataSets::new();
    authored.insert("BustBody", "Body", [(0, Vec3::X)].into_iter().collect());
    authored.insert("BustHands", "Hands", [(0, Vec3::Y)].into_iter().collect());
    authored.insert("BustFeet", "Feet", [(0, Vec3::Z)].into_iter().collect());
    authored.save_data(["BustBody"], &body.join("Body.osd")).unwrap();
    authored.save_data(["BustHands"], &hands.join("Hands.osd")).unwrap();
    authored.save_data(["BustFeet"], &body.join("Feet.osd")).unwrap();

    let mut set = SliderSet::new("Outfit");
    set.set_base_data_path(dir.path());
    set.set_shape_data_folders("Body", vec!["Body".to_owned()]);
    set.set_shape_data_folders("Hands", vec!["Hands".to_owned()]);
    let bust = set.create_slider("Bust");
    set.sliders[bust].add_data_file("Body", "BustBody", "Body.osd/BustBody", false);
    set.sliders[bust].add_data_file("Hands", "BustHands", "Hands.osd/BustHands", false);
    set.sliders[bust].add_data_file("Feet", "BustFeet", "Feet.osd/BustFeet", false);

    let mut store = DiffDataSets::new();
    set.load_set_diff_data(&mut store, Some("Hands"));
    assert_eq!(store.names().collect::<Vec<_>>(), vec!["BustHands"]);

    store.clear();
    set.load_set_diff_data(&mut store, None);
    assert!(store.contains("BustBody"));
    assert!(store.contains("BustHands"));
    assert!(!store.contains("BustFeet"));

    // An empty filter is no filter.
    store.clear();
    set.load_set_diff_data(&mut store, Some(""));
    assert!(store.contains("BustBody"));
    assert!(store.contains("BustHands"));
}

#[test]
fn merge_adds_missing_data_and_routes_base_shape() {
    init();
    let dir = tempfile::tempdir().unwrap();
    let shared = dir.path().join("Shared");
    fs::create_dir_all(&shared).unwrap();

    let mut authored = DiffDataSets::new();
    authored.insert("BustBody", "Body", [(0, Vec3::X)].into_iter().collect());
    authored.insert("BustHands", "Hands", [(0, Vec3::Y)].into_iter().collect());
    authored.insert("BellyBody", "Body", [(1, Vec3::Z)].into_iter().collect());
    authored
        .save_data(["BustBody", "BustHands", "BellyBody"], &shared.join("Merge.osd"))
        .unwrap();

    let mut set = SliderSet::new("Project");
    set.set_shape_data_folders("Body", vec!["Project".to_owned()]);
    let bust = set.create_slider("Bust");
    set.sliders[bust].add_data_file("Body", "BustBody", "Merge.osd/BustBody", false);

    let mut merge_set = SliderSet::new("Reference");
    merge_set.set_base_data_path(dir.path());
    merge_set.set_shape_data_folders("Body", vec!["Shared".to_owned()]);
    merge_set.set_shape_data_folders("Hands", vec!["Shared".to_owned()]);
    let bust = merge_set.create_slider("Bust");
    merge_set.sliders[bust].add_data_file("Body", "BustBody", "Merge.osd/BustBody", false);
    merge_set.sliders[bust].add_data_file("Hands", "BustHands", "Merge.osd/BustHands", false);
    let belly = merge_set.create_slider("Belly");
    merge_set.sliders[belly].add_data_file("Body", "BellyBody", "Merge.osd/BellyBody", false);
    let before = merge_set.clone();

    let mut store = DiffDataSets::new();
    let mut base_store = DiffDataSets::new();
    set.merge(&merge_set, &mut store, &mut base_store, "Body", true);

    assert_eq!(merge_set, before);
    assert_eq!(set.len(), 2);

    let bust = set.slider("Bust").unwrap();
    assert_eq!(bust.data_files.len(), 2);
    assert!(!bust.data_files[0].local);
    assert!(bust.data_files[1].local);

    let belly = set.slider("Belly").unwrap();
    assert!(belly.data_files.iter().all(|df| df.local));

    // Only the entries that were added get loaded, split by shape.
    assert!(!store.contains("BustBody"));
    assert!(store.contains("BustHands"));
    assert!(base_store.contains("BellyBody"));
    assert!(!base_store.contains("BustHands"));

    assert!(set.shape_data_folders("Body").is_empty());
    assert!(set.shape_data_folders("Hands").is_empty());
}
