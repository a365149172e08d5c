//! Marching-cubes case table.
//!
//! Corner `i` of a cube sits at offset `(i & 1, (i >> 1) & 1, (i >> 2) & 1)`
//! from the cube origin. Edges 0-3 run along x, 4-7 along y, 8-11 along z;
//! [`EDGE_CORNERS`] lists each edge's endpoints, low corner first.
//!
//! Saddle configurations follow the single fixed convention baked into the
//! table. There is no per-cube disambiguation.

#![allow(clippy::unreadable_literal, clippy::cast_possible_truncation)]

use std::collections::BTreeMap;
use std::sync::OnceLock;

use glam::{BVec3, IVec3};

use crate::field::Axis;
use crate::sink::{VertexId, VertexSink};

/// Lattice offsets of the 8 cube corners.
pub const CORNER_OFFSETS: [IVec3; 8] = [
    IVec3::new(0, 0, 0),
    IVec3::new(1, 0, 0),
    IVec3::new(0, 1, 0),
    IVec3::new(1, 1, 0),
    IVec3::new(0, 0, 1),
    IVec3::new(1, 0, 1),
    IVec3::new(0, 1, 1),
    IVec3::new(1, 1, 1),
];

/// Endpoints of the 12 cube edges, low corner first.
pub const EDGE_CORNERS: [[usize; 2]; 12] = [
    [0, 1],
    [2, 3],
    [4, 5],
    [6, 7],
    [0, 2],
    [1, 3],
    [4, 6],
    [5, 7],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

/// Axis along which an edge runs.
#[must_use]
pub fn edge_axis(edge: usize) -> Axis {
    Axis::ALL[edge / 4]
}

/// Offset of an edge's low corner from the cube origin.
#[must_use]
pub fn edge_origin(edge: usize) -> IVec3 {
    CORNER_OFFSETS[EDGE_CORNERS[edge][0]]
}

/// Cube face shared by two edges, as (axis, side), if any.
fn common_face(a: usize, b: usize) -> Option<(Axis, i32)> {
    let (oa, ob) = (edge_origin(a), edge_origin(b));
    Axis::ALL.into_iter().find_map(|axis| {
        let i = axis.index();
        (axis != edge_axis(a) && axis != edge_axis(b) && oa[i] == ob[i]).then_some((axis, oa[i]))
    })
}

/// Bit `i` is set when corner `i` lies below `level`.
#[must_use]
pub fn corner_pattern(values: &[f32; 8], level: f32) -> u8 {
    values
        .iter()
        .enumerate()
        .fold(0, |pattern, (i, &v)| pattern | (u8::from(v < level) << i))
}

/// A contour segment on one face of the cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseLine {
    /// The two edges whose crossings the segment joins.
    pub edges: [usize; 2],
    /// Axis normal to the face holding the segment.
    pub face_axis: Axis,
    /// 0 for the face at the cube origin, 1 for the opposite face.
    pub face_side: i32,
}

#[derive(Debug, Clone, Default)]
struct Case {
    triangles: Vec<[usize; 3]>,
    lines: Vec<CaseLine>,
}

impl Case {
    fn decode(packed: u64) -> Self {
        let n_triangles = (packed & 0xF) as usize;
        let triangles: Vec<[usize; 3]> = (0..n_triangles)
            .map(|t| std::array::from_fn(|k| ((packed >> (4 + 12 * t + 4 * k)) & 0xF) as usize))
            .collect();

        let mut segments = BTreeMap::new();
        for tri in &triangles {
            for k in 0..3 {
                let (a, b) = (tri[k], tri[(k + 1) % 3]);
                let key = [a.min(b), a.max(b)];
                if let Some((face_axis, face_side)) = common_face(a, b) {
                    segments.entry(key).or_insert(CaseLine {
                        edges: key,
                        face_axis,
                        face_side,
                    });
                }
            }
        }

        Self {
            triangles,
            lines: segments.into_values().collect(),
        }
    }
}

/// Decoded marching-cubes table, shared read-only by every extractor.
#[derive(Debug)]
pub struct CaseTable {
    cases: Vec<Case>,
}

static CASE_TABLE: OnceLock<CaseTable> = OnceLock::new();

impl CaseTable {
    /// Returns the process-wide table, decoding it on first use.
    pub fn shared() -> &'static CaseTable {
        CASE_TABLE.get_or_init(|| CaseTable {
            cases: MC_TRIS.iter().map(|&packed| Case::decode(packed)).collect(),
        })
    }

    /// Triangles of `pattern` as edge triples.
    #[must_use]
    pub fn triangles(&self, pattern: u8) -> &[[usize; 3]] {
        &self.cases[pattern as usize].triangles
    }

    /// Face contour segments of `pattern`.
    #[must_use]
    pub fn lines(&self, pattern: u8) -> &[CaseLine] {
        &self.cases[pattern as usize].lines
    }

    /// Appends the triangles of `pattern` to `sink`.
    ///
    /// A triangle referencing an edge without a vertex is skipped without
    /// further checks. Returns the number of triangles added.
    pub fn emit_triangles<S: VertexSink + ?Sized>(
        &self,
        pattern: u8,
        edge_ids: &[Option<VertexId>; 12],
        sink: &mut S,
    ) -> usize {
        let mut emitted = 0;
        for &[a, b, c] in self.triangles(pattern) {
            if let (Some(a), Some(b), Some(c)) = (edge_ids[a], edge_ids[b], edge_ids[c]) {
                sink.add_tri(a, b, c);
                emitted += 1;
            }
        }
        emitted
    }

    /// Appends the face contour segments of `pattern` to `sink`.
    ///
    /// Segments on a low face (side 0) are left out for every axis set in
    /// `shared_low_faces`; the neighbouring cube emits them as its high face.
    /// Returns the number of segments added.
    pub fn emit_lines<S: VertexSink + ?Sized>(
        &self,
        pattern: u8,
        edge_ids: &[Option<VertexId>; 12],
        shared_low_faces: BVec3,
        sink: &mut S,
    ) -> usize {
        let mut emitted = 0;
        for line in self.lines(pattern) {
            if line.face_side == 0 && shared_low_faces.test(line.face_axis.index()) {
                continue;
            }
            let [a, b] = line.edges;
            if let (Some(a), Some(b)) = (edge_ids[a], edge_ids[b]) {
                sink.add_line(a, b);
                emitted += 1;
            }
        }
        emitted
    }
}

/// Look-up table for triangle configurations (256 entries, one per cube configuration).
///
/// Each entry is a `u64` encoding:
/// - Bits `[3:0]`: Number of triangles (0-5)
/// - Bits `[7:4]`, `[11:8]`, ...: Edge indices (0-11) for each triangle vertex, 4 bits each
///
/// Source: `MarchingCubeCpp` (public domain).
#[rustfmt::skip]
static MC_TRIS: [u64; 256] = [
    0, 33793, 36945, 159668546,
    18961, 144771090, 5851666, 595283255635,
    20913, 67640146, 193993474, 655980856339,
    88782242, 736732689667, 797430812739, 194554754,
    26657, 104867330, 136709522, 298069416227,
    109224258, 8877909667, 318136408323, 1567994331701604,
    189884450, 350847647843, 559958167731, 3256298596865604,
    447393122899, 651646838401572, 2538311371089956, 737032694307,
    29329, 43484162, 91358498, 374810899075,
    158485010, 178117478419, 88675058979, 433581536604804,
    158486962, 649105605635, 4866906995, 3220959471609924,
    649165714851, 3184943915608436, 570691368417972, 595804498035,
    124295042, 431498018963, 508238522371, 91518530,
    318240155763, 291789778348404, 1830001131721892, 375363605923,
    777781811075, 1136111028516116, 3097834205243396, 508001629971,
    2663607373704004, 680242583802939237, 333380770766129845, 179746658,
    42545, 138437538, 93365810, 713842853011,
    73602098, 69575510115, 23964357683, 868078761575828,
    28681778, 713778574611, 250912709379, 2323825233181284,
    302080811955, 3184439127991172, 1694042660682596, 796909779811,
    176306722, 150327278147, 619854856867, 1005252473234484,
    211025400963, 36712706, 360743481544788, 150627258963,
    117482600995, 1024968212107700, 2535169275963444, 4734473194086550421,
    628107696687956, 9399128243, 5198438490361643573, 194220594,
    104474994, 566996932387, 427920028243, 2014821863433780,
    492093858627, 147361150235284, 2005882975110676, 9671606099636618005,
    777701008947, 3185463219618820, 482784926917540, 2900953068249785909,
    1754182023747364, 4274848857537943333, 13198752741767688709, 2015093490989156,
    591272318771, 2659758091419812, 1531044293118596, 298306479155,
    408509245114388, 210504348563, 9248164405801223541, 91321106,
    2660352816454484, 680170263324308757, 8333659837799955077, 482966828984116,
    4274926723105633605, 3184439197724820, 192104450, 15217,
    45937, 129205250, 129208402, 529245952323,
    169097138, 770695537027, 382310500883, 2838550742137652,
    122763026, 277045793139, 81608128403, 1991870397907988,
    362778151475, 2059003085103236, 2132572377842852, 655681091891,
    58419234, 239280858627, 529092143139, 1568257451898804,
    447235128115, 679678845236084, 2167161349491220, 1554184567314086709,
    165479003923, 1428768988226596, 977710670185060, 10550024711307499077,
    1305410032576132, 11779770265620358997, 333446212255967269, 978168444447012,
    162736434, 35596216627, 138295313843, 891861543990356,
    692616541075, 3151866750863876, 100103641866564, 6572336607016932133,
    215036012883, 726936420696196, 52433666, 82160664963,
    2588613720361524, 5802089162353039525, 214799000387, 144876322,
    668013605731, 110616894681956, 1601657732871812, 430945547955,
    3156382366321172, 7644494644932993285, 3928124806469601813, 3155990846772900,
    339991010498708, 10743689387941597493, 5103845475, 105070898,
    3928064910068824213, 156265010, 1305138421793636, 27185,
    195459938, 567044449971, 382447549283, 2175279159592324,
    443529919251, 195059004769796, 2165424908404116, 1554158691063110021,
    504228368803, 1436350466655236, 27584723588724, 1900945754488837749,
    122971970, 443829749251, 302601798803, 108558722,
    724700725875, 43570095105972, 2295263717447940, 2860446751369014181,
    2165106202149444, 69275726195, 2860543885641537797, 2165106320445780,
    2280890014640004, 11820349930268368933, 8721082628082003989, 127050770,
    503707084675, 122834978, 2538193642857604, 10129,
    801441490467, 2923200302876740, 1443359556281892, 2901063790822564949,
    2728339631923524, 7103874718248233397, 12775311047932294245, 95520290,
    2623783208098404, 1900908618382410757, 137742672547, 2323440239468964,
    362478212387, 727199575803140, 73425410, 34337,
    163101314, 668566030659, 801204361987, 73030562,
    591509145619, 162574594, 100608342969108, 5553,
    724147968595, 1436604830452292, 176259090, 42001,
    143955266, 2385, 18433, 0,
];
