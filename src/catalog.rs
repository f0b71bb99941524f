//! The snapshot cases.
//!
//! Every case is data: a storage class, the scenario it runs and the
//! options of that run, built from the driver data of the target cluster.

use std::str::FromStr;

use crate::config::DriverData;
use crate::driver::rules::INDEPENDENT_FILESET_REQUIRED;
use crate::driver::{Feature, StorageClassType};
use crate::error::{Error, Result};
use crate::params::{
    AccessMode, ConsistencyGroup, FilesetType, PodParams, PvcParams, SnapshotClassParams,
    StorageClassParams,
};
use crate::suite::SnapshotRun;

/// Case markers used for selection.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Marker {
    Regression,
    Slow,
    ConsistencyGroup,
    /// The case is expected to fail.
    ExpectedFail,
}

impl FromStr for Marker {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "regression" => Ok(Marker::Regression),
            "slow" => Ok(Marker::Slow),
            "cg" => Ok(Marker::ConsistencyGroup),
            "xfail" => Ok(Marker::ExpectedFail),
            other => Err(Error::Config(format!("unknown marker {}", other))),
        }
    }
}

impl std::fmt::Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Marker::Regression => write!(f, "regression"),
            Marker::Slow => write!(f, "slow"),
            Marker::ConsistencyGroup => write!(f, "cg"),
            Marker::ExpectedFail => write!(f, "xfail"),
        }
    }
}

/// Scenario a case runs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CaseKind {
    /// Report the versions of everything involved.
    Version,
    Static,
    Dynamic,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotCase {
    pub name: String,
    pub kind: CaseKind,
    pub markers: Vec<Marker>,
    pub sc: StorageClassParams,
    pub run: SnapshotRun,
}

impl SnapshotCase {
    fn new(name: &str, kind: CaseKind, sc: StorageClassParams, run: SnapshotRun) -> Self {
        Self {
            name: name.to_string(),
            kind,
            markers: Vec::new(),
            sc,
            run: run.label(name),
        }
    }

    fn marked(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn has_marker(&self, marker: Marker) -> bool {
        self.markers.contains(&marker)
    }

    pub fn expects_failure(&self) -> bool {
        self.has_marker(Marker::ExpectedFail)
    }

    /// Filesystem features the case needs.
    pub fn required_features(&self) -> Vec<Feature> {
        if self.kind == CaseKind::Version {
            return Vec::new();
        }
        let mut features = vec![Feature::Snapshot];
        let advanced = self.sc.storage_class_type() == StorageClassType::Advanced
            || self
                .run
                .restore_sc
                .as_ref()
                .is_some_and(|sc| sc.storage_class_type() == StorageClassType::Advanced);
        if advanced {
            features.push(Feature::ConsistencyGroup);
        }
        if self.run.value_clone_passed.is_some() {
            features.push(Feature::VolumeClone);
        }
        features
    }
}

/// Which cases to run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    /// Run cases carrying any of these markers; all cases when empty.
    pub markers: Vec<Marker>,
    /// Run cases whose name contains any of these; all cases when empty.
    pub names: Vec<String>,
    pub run_slow: bool,
}

impl Selection {
    pub fn selects(&self, case: &SnapshotCase) -> bool {
        let by_marker = self.markers.is_empty() || self.markers.iter().any(|m| case.has_marker(*m));
        let by_name = self.names.is_empty() || self.names.iter().any(|n| case.name.contains(n.as_str()));
        by_marker && by_name
    }

    /// Why a selected case does not run.
    pub fn skip_reason(&self, case: &SnapshotCase) -> Option<String> {
        if case.has_marker(Marker::Slow) && !self.run_slow {
            return Some("need --runslow option to run".to_string());
        }
        None
    }
}

struct Values<'a> {
    data: &'a DriverData,
}

impl Values<'_> {
    fn fs(&self) -> StorageClassParams {
        StorageClassParams::on_filesystem(&self.data.primary_fs)
    }

    fn fs_cluster(&self) -> StorageClassParams {
        self.fs().cluster_id(&self.data.id)
    }

    fn uid(&self, sc: StorageClassParams) -> StorageClassParams {
        sc.uid(&self.data.uid_number)
    }

    fn gid(&self, sc: StorageClassParams) -> StorageClassParams {
        sc.gid(&self.data.gid_number)
    }

    fn inode(&self, sc: StorageClassParams) -> StorageClassParams {
        sc.inode_limit(&self.data.inode_limit)
    }

    fn light_weight(&self) -> StorageClassParams {
        self.fs().vol_dir_base_path(&self.data.vol_dir_base_path)
    }

    fn dependent(&self) -> StorageClassParams {
        self.fs_cluster().fileset_type(FilesetType::Dependent)
    }

    fn advanced(&self) -> StorageClassParams {
        self.fs().version("2")
    }

    /// Storage class of `pass_<n>` and whether it restores.
    fn pass_variant(&self, n: u32) -> Option<(StorageClassParams, bool)> {
        let sc = match n {
            1 | 24 => self.fs_cluster(),
            3 => self.gid(self.fs_cluster()),
            4 => self.inode(self.fs_cluster()),
            5 => self.uid(self.inode(self.fs_cluster())),
            6 => self.uid(self.gid(self.fs_cluster())),
            7 => self.gid(self.inode(self.fs_cluster())),
            8 => self.gid(self.uid(self.inode(self.fs_cluster()))),
            9 => self.uid(self.fs_cluster()),
            10 => self
                .inode(self.fs_cluster())
                .fileset_type(FilesetType::Independent),
            11 => self
                .inode(self.uid(self.gid(self.fs_cluster())))
                .fileset_type(FilesetType::Independent),
            12 => self.fs(),
            13 => self.uid(self.fs()),
            14 => self.gid(self.fs()),
            15 => self.inode(self.fs()),
            16 => self.gid(self.uid(self.fs())),
            17 | 25 => self.inode(self.uid(self.fs())),
            18 => self.inode(self.gid(self.fs())),
            19 => self.uid(self.gid(self.fs_cluster())),
            20 => self.inode(self.uid(self.fs_cluster())),
            21 => self.inode(self.gid(self.fs_cluster())),
            22 | 26 => self.inode(self.uid(self.gid(self.fs()))),
            23 => self.inode(self.uid(self.gid(self.fs_cluster()))),
            _ => return None,
        };
        Some((sc, n < 24))
    }

    /// Source and restore storage classes of `different_sc_<n>`.
    fn different_sc(&self, n: u32) -> Option<(StorageClassParams, StorageClassParams)> {
        let source = match n {
            1 | 2 => self.fs_cluster(),
            3 | 4 => self.gid(self.uid(self.inode(self.fs_cluster()))),
            5 | 6 => self
                .inode(self.fs_cluster())
                .fileset_type(FilesetType::Independent),
            _ => return None,
        };
        let restore = if n % 2 == 1 {
            self.light_weight()
        } else {
            self.dependent()
        };
        Some((source, restore))
    }

    /// Restore storage class and claim of `nodeclass_<n>`.
    fn nodeclass(&self, n: u32) -> Option<(StorageClassParams, Option<PvcParams>)> {
        let node_class = match n {
            1 => "GUI_MGMT_SERVERS",
            2 => "GUI_SERVERS",
            3 => "randomnodeclassx",
            _ => return None,
        };
        let restore_pvc = (!self.data.knows_node_class(node_class))
            .then(|| PvcParams::rwx_1gi().reason("NotFound desc = nodeclass"));
        Some((self.fs_cluster().node_class(node_class), restore_pvc))
    }

    fn expansion_claim(presnap: &str, post_presnap: [&str; 2], postsnap: [&str; 2]) -> Vec<PvcParams> {
        vec![
            PvcParams::rwx_1gi()
                .presnap_expansion([presnap])
                .post_presnap_expansion(post_presnap)
                .postsnap_expansion(postsnap),
        ]
    }
}

/// Every case, in definition order.
pub fn catalog(data: &DriverData) -> Vec<SnapshotCase> {
    use CaseKind::{Dynamic, Static, Version};
    use Marker::{ConsistencyGroup as Cg, ExpectedFail, Regression, Slow};

    let v = Values { data };
    let mut cases = Vec::new();

    cases.push(
        SnapshotCase::new("test_get_version", Version, StorageClassParams::default(), SnapshotRun::default())
            .marked(Regression),
    );

    // Static snapshots
    for n in (1..=26).filter(|n| *n != 2) {
        let Some((sc, restore)) = v.pass_variant(n) else {
            continue;
        };
        let run = if restore { SnapshotRun::restore() } else { SnapshotRun::snapshot_only() };
        let mut case = SnapshotCase::new(&format!("test_snapshot_static_pass_{}", n), Static, sc, run);
        if n == 1 {
            case = case.marked(Regression);
        }
        cases.push(case);
        if n == 1 {
            cases.push(
                SnapshotCase::new(
                    "test_snapshot_static_multiple_snapshots",
                    Static,
                    v.fs_cluster(),
                    SnapshotRun::restore().snapshots(3),
                )
                .marked(Regression),
            );
        }
    }

    // Dynamic snapshots
    cases.push(
        SnapshotCase::new("test_snapshot_dynamic_pass_1", Dynamic, v.fs_cluster(), SnapshotRun::restore())
            .marked(Regression),
    );
    cases.push(SnapshotCase::new(
        "test_snapshot_dynamic_pass_2",
        Dynamic,
        v.fs_cluster(),
        SnapshotRun::restore().vs_class(SnapshotClassParams::retain()),
    ));
    cases.push(
        SnapshotCase::new(
            "test_snapshot_dynamic_expected_fail_1",
            Dynamic,
            v.dependent(),
            SnapshotRun::snapshot_only().reason(INDEPENDENT_FILESET_REQUIRED),
        )
        .marked(Regression)
        .marked(ExpectedFail),
    );
    cases.push(
        SnapshotCase::new(
            "test_snapshot_dynamic_expected_fail_2",
            Dynamic,
            v.light_weight(),
            SnapshotRun::snapshot_only().reason(INDEPENDENT_FILESET_REQUIRED),
        )
        .marked(Regression)
        .marked(ExpectedFail),
    );
    cases.push(SnapshotCase::new(
        "test_snapshot_dynamic_multiple_snapshots",
        Dynamic,
        v.fs_cluster(),
        SnapshotRun::restore().snapshots(3),
    ));
    for count in [256, 257] {
        cases.push(
            SnapshotCase::new(
                &format!("test_snapshot_dynamic_multiple_snapshots_{}", count),
                Dynamic,
                v.fs_cluster(),
                SnapshotRun::restore().snapshots(count),
            )
            .marked(Slow),
        );
    }
    for n in 3..=26 {
        let Some((sc, restore)) = v.pass_variant(n) else {
            continue;
        };
        let run = if restore { SnapshotRun::restore() } else { SnapshotRun::snapshot_only() };
        cases.push(SnapshotCase::new(&format!("test_snapshot_dynamic_pass_{}", n), Dynamic, sc, run));
    }

    // Restores into a different storage class
    for kind in [Dynamic, Static] {
        let prefix = if kind == Dynamic { "dynamic" } else { "static" };
        for n in 1..=6 {
            let Some((sc, restore_sc)) = v.different_sc(n) else {
                continue;
            };
            let mut case = SnapshotCase::new(
                &format!("test_snapshot_{}_different_sc_{}", prefix, n),
                kind,
                sc,
                SnapshotRun::restore().restore_sc(restore_sc),
            );
            if kind == Dynamic && n <= 2 {
                case = case.marked(Regression);
            }
            cases.push(case);
        }
    }

    // Restores pinned to a node class
    for kind in [Dynamic, Static] {
        let prefix = if kind == Dynamic { "dynamic" } else { "static" };
        for n in 1..=3 {
            let Some((restore_sc, restore_pvc)) = v.nodeclass(n) else {
                continue;
            };
            let mut run = SnapshotRun::restore().restore_sc(restore_sc);
            if let Some(pvc) = restore_pvc {
                run = run.restore_pvc(pvc);
            }
            let mut case = SnapshotCase::new(
                &format!("test_snapshot_{}_nodeclass_{}", prefix, n),
                kind,
                v.fs_cluster(),
                run,
            );
            if kind == Dynamic && n != 2 {
                case = case.marked(Regression);
            }
            cases.push(case);
        }
    }

    cases.push(SnapshotCase::new(
        "test_snapshot_dynamic_permissions_777_independent",
        Dynamic,
        v.uid(v.gid(v.fs_cluster().permissions("777"))),
        SnapshotRun::restore().pod(PodParams::default().sub_path("sub_path_mnt", false)),
    ));

    // Volume expansion around snapshots
    let expandable = || v.fs_cluster().allow_volume_expansion(true);
    cases.push(SnapshotCase::new(
        "test_snapshot_dynamic_volume_expansion_1",
        Dynamic,
        expandable(),
        SnapshotRun::restore().pvcs(Values::expansion_claim("2Gi", ["5Gi", "15Gi"], ["10Gi", "15Gi"])),
    ));
    cases.push(SnapshotCase::new(
        "test_snapshot_dynamic_volume_expansion_2",
        Dynamic,
        expandable(),
        SnapshotRun::restore()
            .pvcs(Values::expansion_claim("3Gi", ["5Gi", "12Gi"], ["8Gi", "12Gi"]))
            .restore_sc(v.dependent().allow_volume_expansion(true)),
    ));
    cases.push(SnapshotCase::new(
        "test_snapshot_dynamic_volume_expansion_3",
        Dynamic,
        expandable(),
        SnapshotRun::restore()
            .pvcs(Values::expansion_claim("2Gi", ["5Gi", "15Gi"], ["10Gi", "15Gi"]))
            .restore_sc(v.light_weight().allow_volume_expansion(true)),
    ));

    cases.push(SnapshotCase::new(
        "test_snapshot_dynamic_volume_cloning_1",
        Dynamic,
        v.fs_cluster(),
        SnapshotRun::restore()
            .pvcs(vec![PvcParams::rwx_1gi()])
            .clones(vec![PvcParams::rwx_1gi(), PvcParams::new(AccessMode::ReadWriteOnce, "1Gi")]),
    ));

    // Consistency groups
    let window = |minutes: &str| SnapshotClassParams::delete().snap_window(minutes);
    cases.push(
        SnapshotCase::new(
            "test_snapshot_cg_pass_1",
            Dynamic,
            v.advanced().consistency_group(ConsistencyGroup::Auto),
            SnapshotRun::restore().vs_class(window("15")),
        )
        .marked(Regression)
        .marked(Cg),
    );
    cases.push(
        SnapshotCase::new(
            "test_snapshot_cg_pass_2",
            Dynamic,
            v.advanced().consistency_group(ConsistencyGroup::Named(
                "local-test_snapshot_cg_pass_2-cg".to_string(),
            )),
            SnapshotRun::restore()
                .vs_class(SnapshotClassParams::delete())
                .snapshots(10),
        )
        .marked(Cg),
    );
    cases.push(
        SnapshotCase::new(
            "test_snapshot_cg_pass_3",
            Dynamic,
            v.advanced(),
            SnapshotRun::restore()
                .vs_class(window("2"))
                .pvcs(vec![PvcParams::rwx_1gi(); 3])
                .snapshots(3),
        )
        .marked(Cg),
    );
    let tier = data.tier.as_str();
    for (name, sc) in [
        ("test_snapshot_cg_tier", v.advanced().tier(tier)),
        ("test_snapshot_cg_compression", v.advanced().compression("true")),
        (
            "test_snapshot_cg_compression_tier",
            v.advanced().tier(tier).compression("true"),
        ),
    ] {
        cases.push(
            SnapshotCase::new(name, Dynamic, sc, SnapshotRun::restore().vs_class(window("15")))
                .marked(Cg),
        );
    }

    cases
}

/// Look up a case by exact name.
pub fn find<'a>(cases: &'a [SnapshotCase], name: &str) -> Option<&'a SnapshotCase> {
    cases.iter().find(|c| c.name == name)
}
