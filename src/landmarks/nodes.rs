//! Static landmark tables for the 478-point face mesh topology.
//!
//! The bilateral correspondence table pairs every "left" landmark with its
//! mirror "right" landmark. "Left" and "right" are table labels, not the
//! side of the image a landmark appears on.

use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;

use crate::config::config::Side;

/// Number of landmarks produced by the tracker (468 mesh points + 10 iris points).
pub const NUM_LANDMARKS: usize = 478;

/// Hand-curated (left, right) mirror pairs.
pub const LEFT_RIGHT_PAIRS: [(usize, usize); 220] = [
    (3, 248), (7, 249), (20, 250), (21, 251), (22, 252), (23, 253), (24, 254),
    (25, 255), (26, 256), (27, 257), (28, 258), (29, 259), (30, 260), (31, 261),
    (32, 262), (33, 263), (34, 264), (35, 265), (36, 266), (37, 267), (38, 268),
    (39, 269), (40, 270), (41, 271), (42, 272), (43, 273), (44, 274), (45, 275),
    (46, 276), (47, 277), (48, 278), (49, 279), (50, 280), (51, 281), (52, 282),
    (53, 283), (54, 284), (55, 285), (56, 286), (57, 287), (58, 288), (59, 289),
    (60, 290), (61, 291), (62, 292), (63, 293), (64, 294), (65, 295), (66, 296),
    (67, 297), (68, 298), (69, 299), (70, 300), (71, 301), (72, 302), (73, 303),
    (74, 304), (75, 305), (76, 306), (77, 307), (78, 308), (79, 309), (80, 310),
    (81, 311), (82, 312), (83, 313), (84, 314), (85, 315), (86, 316), (87, 317),
    (88, 318), (89, 319), (90, 320), (91, 321), (92, 322), (93, 323), (95, 324),
    (96, 325), (97, 326), (98, 327), (99, 328), (100, 329), (101, 330),
    (102, 331), (103, 332), (104, 333), (105, 334), (106, 335), (107, 336),
    (108, 337), (109, 338), (110, 339), (111, 340), (112, 341), (113, 342),
    (114, 343), (115, 344), (116, 345), (117, 346), (118, 347), (119, 348),
    (120, 349), (121, 350), (122, 351), (123, 352), (124, 353), (125, 354),
    (126, 355), (127, 356), (128, 357), (129, 358), (130, 359), (131, 360),
    (132, 361), (133, 362), (134, 363), (135, 364), (136, 365), (137, 366),
    (138, 367), (139, 368), (140, 369), (141, 370), (142, 371), (143, 372),
    (144, 373), (145, 374), (146, 375), (147, 376), (148, 377), (149, 378),
    (150, 379), (153, 380), (154, 381), (155, 382), (156, 383), (157, 384),
    (158, 385), (159, 386), (160, 387), (161, 388), (162, 389), (163, 390),
    (165, 391), (166, 392), (167, 393), (169, 394), (170, 395), (171, 396),
    (172, 397), (173, 398), (174, 399), (176, 400), (177, 401), (178, 402),
    (179, 403), (180, 404), (181, 405), (182, 406), (183, 407), (184, 408),
    (185, 409), (186, 410), (187, 411), (188, 412), (189, 413), (190, 414),
    (191, 415), (192, 416), (193, 417), (194, 418), (196, 419), (198, 420),
    (201, 421), (202, 422), (203, 423), (204, 424), (205, 425), (206, 426),
    (207, 427), (208, 428), (209, 429), (210, 430), (211, 431), (212, 432),
    (213, 433), (214, 434), (215, 435), (216, 436), (217, 437), (218, 438),
    (219, 439), (220, 440), (221, 441), (222, 442), (223, 443), (224, 444),
    (225, 445), (226, 446), (227, 447), (228, 448), (229, 449), (230, 450),
    (231, 451), (232, 452), (233, 453), (234, 454), (235, 455), (236, 456),
    (237, 457), (238, 458), (239, 459), (240, 460), (241, 461), (242, 462),
    (243, 463), (244, 464), (245, 465), (246, 466), (247, 467),
];

/// Landmarks expected to stay on the symmetry axis.
pub const MIDLINE_INDICES: [usize; 28] = [
    0, 1, 2, 4, 5, 6, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 94, 151,
    152, 164, 168, 175, 195, 197, 199, 200,
];

/// How the correspondence table labels an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkClass {
    Left,
    Right,
    Midline,
    /// Not in any curated set. Callers treat these as midline anchors.
    Unlisted,
}

static FLIP_MAP: Lazy<HashMap<usize, usize>> = Lazy::new(|| {
    let mut map = HashMap::with_capacity(LEFT_RIGHT_PAIRS.len() * 2);
    for &(left, right) in LEFT_RIGHT_PAIRS.iter() {
        map.insert(left, right);
        map.insert(right, left);
    }
    map
});

pub static LEFT_LANDMARKS: Lazy<BTreeSet<usize>> =
    Lazy::new(|| LEFT_RIGHT_PAIRS.iter().map(|&(left, _)| left).collect());

pub static RIGHT_LANDMARKS: Lazy<BTreeSet<usize>> =
    Lazy::new(|| LEFT_RIGHT_PAIRS.iter().map(|&(_, right)| right).collect());

pub static MIDLINE_LANDMARKS: Lazy<BTreeSet<usize>> =
    Lazy::new(|| MIDLINE_INDICES.iter().copied().collect());

/// Mirror partner of `index`, if the table pairs it.
pub fn flip(index: usize) -> Option<usize> {
    FLIP_MAP.get(&index).copied()
}

/// Mirror partner of `index`, or `index` itself for unpaired landmarks.
pub fn flip_or_self(index: usize) -> usize {
    flip(index).unwrap_or(index)
}

pub fn is_left(index: usize) -> bool {
    LEFT_LANDMARKS.contains(&index)
}

pub fn is_right(index: usize) -> bool {
    RIGHT_LANDMARKS.contains(&index)
}

pub fn is_midline(index: usize) -> bool {
    MIDLINE_LANDMARKS.contains(&index)
}

pub fn classify(index: usize) -> LandmarkClass {
    if is_midline(index) {
        LandmarkClass::Midline
    } else if is_left(index) {
        LandmarkClass::Left
    } else if is_right(index) {
        LandmarkClass::Right
    } else {
        LandmarkClass::Unlisted
    }
}

pub fn side_landmarks(side: Side) -> &'static BTreeSet<usize> {
    match side {
        Side::Left => &*LEFT_LANDMARKS,
        Side::Right => &*RIGHT_LANDMARKS,
    }
}

pub fn belongs_to_side(index: usize, side: Side) -> bool {
    side_landmarks(side).contains(&index)
}

// Region groups ------------------------------------------------------------

const FACE_OUTLINE: &[usize] = &[
    10, 21, 54, 58, 67, 93, 103, 109, 127, 132, 136, 148, 149, 150, 152, 162, 172, 176, 234, 251,
    284, 288, 297, 323, 332, 338, 356, 361, 365, 377, 378, 379, 389, 397, 400, 454,
];

const FOREHEAD: &[usize] = &[
    8, 9, 10, 21, 52, 53, 54, 55, 63, 65, 66, 67, 68, 69, 70, 71, 103, 104, 105, 107, 108, 109,
    151, 162, 251, 282, 283, 284, 285, 293, 295, 296, 297, 298, 299, 300, 301, 332, 333, 334, 336,
    337, 338, 389,
];

const CHIN: &[usize] = &[
    58, 136, 148, 149, 150, 152, 172, 176, 288, 365, 377, 378, 379, 397, 400,
];

const NOSE: &[usize] = &[
    1, 2, 4, 5, 6, 19, 45, 48, 64, 94, 97, 98, 115, 168, 195, 197, 220, 275, 278, 294, 326, 327,
    344, 440,
];

const MOUTH_OUTER_UPPER: &[usize] = &[0, 37, 39, 40, 185, 267, 269, 270, 291, 409];
const MOUTH_OUTER_LOWER: &[usize] = &[17, 61, 84, 91, 146, 181, 314, 321, 375, 405];
const MOUTH_INNER_UPPER: &[usize] = &[13, 80, 81, 82, 191, 308, 310, 311, 312, 415];
const MOUTH_INNER_LOWER: &[usize] = &[14, 78, 87, 88, 95, 178, 317, 318, 324, 402];

const LEFT_EYE_UPPER_LID: &[usize] = &[263, 384, 385, 386, 387, 388, 398, 466];
const LEFT_EYE_LOWER_LID: &[usize] = &[249, 362, 373, 374, 380, 381, 382, 390];
const RIGHT_EYE_UPPER_LID: &[usize] = &[33, 157, 158, 159, 160, 161, 173, 246];
const RIGHT_EYE_LOWER_LID: &[usize] = &[7, 133, 144, 145, 153, 154, 155, 163];

const LEFT_EYEBROW_UPPER: &[usize] = &[293, 295, 296, 334, 336];
const LEFT_EYEBROW_LOWER: &[usize] = &[276, 282, 283, 285, 300];
const RIGHT_EYEBROW_UPPER: &[usize] = &[63, 65, 66, 105, 107];
const RIGHT_EYEBROW_LOWER: &[usize] = &[46, 52, 53, 55, 70];

const LEFT_IRIS: &[usize] = &[474, 475, 476, 477];
const RIGHT_IRIS: &[usize] = &[469, 470, 471, 472];

const LEFT_CHEEK: &[usize] = &[
    22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 34, 35, 36, 41, 42, 47, 49, 50, 56, 57, 59, 62, 73,
    74, 75, 76, 77, 89, 92, 93, 96, 100, 101, 102, 110, 111, 112, 113, 114, 116, 117, 118, 119,
    120, 121, 123, 124, 126, 127, 128, 129, 130, 131, 132, 137, 139, 142, 143, 147, 156, 162, 165,
    166, 177, 183, 184, 186, 187, 189, 190, 192, 198, 203, 205, 206, 207, 209, 213, 215, 216, 217,
    218, 219, 221, 222, 223, 224, 225, 226, 227, 228, 229, 230, 231, 232, 233, 234, 235, 240, 243,
    244, 245, 247,
];

const RIGHT_CHEEK: &[usize] = &[
    252, 253, 254, 255, 256, 257, 258, 259, 260, 261, 264, 265, 266, 271, 272, 277, 279, 280, 286,
    287, 289, 292, 303, 304, 305, 306, 307, 319, 322, 323, 325, 329, 330, 331, 339, 340, 341, 342,
    343, 345, 346, 347, 348, 349, 350, 352, 353, 355, 356, 357, 358, 359, 360, 361, 366, 368, 371,
    372, 376, 383, 389, 391, 392, 401, 407, 408, 410, 411, 413, 414, 416, 420, 423, 425, 426, 427,
    429, 433, 435, 436, 437, 438, 439, 441, 442, 443, 444, 445, 446, 447, 448, 449, 450, 451, 452,
    453, 454, 455, 460, 463, 464, 465, 467,
];

/// A named landmark group; a node's indices cover those of its children.
#[derive(Debug, Clone)]
pub struct LandmarkNode {
    pub indices: BTreeSet<usize>,
    pub children: Vec<(&'static str, LandmarkNode)>,
}

impl LandmarkNode {
    fn leaf(indices: &[usize]) -> Self {
        LandmarkNode {
            indices: indices.iter().copied().collect(),
            children: vec![],
        }
    }

    fn from_set(indices: BTreeSet<usize>) -> Self {
        LandmarkNode {
            indices,
            children: vec![],
        }
    }

    /// Builds a parent whose indices are the union of its children.
    fn branch(children: Vec<(&'static str, LandmarkNode)>) -> Self {
        let indices = children
            .iter()
            .flat_map(|(_, child)| child.indices.iter().copied())
            .collect();
        LandmarkNode { indices, children }
    }

    pub fn child(&self, name: &str) -> Option<&LandmarkNode> {
        self.children
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, node)| node)
    }
}

fn eye_complex(
    upper_lid: &[usize],
    lower_lid: &[usize],
    brow_upper: &[usize],
    brow_lower: &[usize],
    iris: &[usize],
) -> LandmarkNode {
    LandmarkNode::branch(vec![
        (
            "eye",
            LandmarkNode::branch(vec![
                ("upper_lid", LandmarkNode::leaf(upper_lid)),
                ("lower_lid", LandmarkNode::leaf(lower_lid)),
            ]),
        ),
        (
            "eyebrow",
            LandmarkNode::branch(vec![
                ("upper_ridge", LandmarkNode::leaf(brow_upper)),
                ("lower_ridge", LandmarkNode::leaf(brow_lower)),
            ]),
        ),
        ("iris", LandmarkNode::leaf(iris)),
    ])
}

pub static LANDMARK_TREE: Lazy<LandmarkNode> = Lazy::new(|| {
    let sides = LandmarkNode::branch(vec![
        ("left", LandmarkNode::from_set((*LEFT_LANDMARKS).clone())),
        ("right", LandmarkNode::from_set((*RIGHT_LANDMARKS).clone())),
    ]);
    let eyes = LandmarkNode::branch(vec![
        (
            "left",
            eye_complex(
                LEFT_EYE_UPPER_LID,
                LEFT_EYE_LOWER_LID,
                LEFT_EYEBROW_UPPER,
                LEFT_EYEBROW_LOWER,
                LEFT_IRIS,
            ),
        ),
        (
            "right",
            eye_complex(
                RIGHT_EYE_UPPER_LID,
                RIGHT_EYE_LOWER_LID,
                RIGHT_EYEBROW_UPPER,
                RIGHT_EYEBROW_LOWER,
                RIGHT_IRIS,
            ),
        ),
    ]);
    let cheeks = LandmarkNode::branch(vec![
        ("left", LandmarkNode::leaf(LEFT_CHEEK)),
        ("right", LandmarkNode::leaf(RIGHT_CHEEK)),
    ]);
    let mouth = LandmarkNode::branch(vec![
        (
            "upper_lip",
            LandmarkNode::branch(vec![
                ("outer", LandmarkNode::leaf(MOUTH_OUTER_UPPER)),
                ("inner", LandmarkNode::leaf(MOUTH_INNER_UPPER)),
            ]),
        ),
        (
            "lower_lip",
            LandmarkNode::branch(vec![
                ("outer", LandmarkNode::leaf(MOUTH_OUTER_LOWER)),
                ("inner", LandmarkNode::leaf(MOUTH_INNER_LOWER)),
            ]),
        ),
    ]);

    LandmarkNode {
        indices: (0..NUM_LANDMARKS).collect(),
        children: vec![
            ("midline", LandmarkNode::from_set((*MIDLINE_LANDMARKS).clone())),
            ("sides", sides),
            ("face_outline", LandmarkNode::leaf(FACE_OUTLINE)),
            ("forehead", LandmarkNode::leaf(FOREHEAD)),
            ("eyes", eyes),
            ("nose", LandmarkNode::leaf(NOSE)),
            ("cheeks", cheeks),
            ("mouth", mouth),
            ("chin", LandmarkNode::leaf(CHIN)),
        ],
    }
});

/// Walks the landmark tree; a leading `"face"` segment is optional.
pub fn group<S: AsRef<str>>(path: &[S]) -> Option<&'static LandmarkNode> {
    let mut keys = path.iter().map(AsRef::as_ref).peekable();
    if keys.peek() == Some(&"face") {
        keys.next();
    }
    let mut node: &'static LandmarkNode = &LANDMARK_TREE;
    for key in keys {
        node = node.child(key)?;
    }
    Some(node)
}

pub fn group_indices<S: AsRef<str>>(path: &[S]) -> Option<&'static BTreeSet<usize>> {
    group(path).map(|node| &node.indices)
}

/// Every node of the tree as a `face/...` path with its indices, depth first.
pub fn iter_groups() -> Vec<(String, &'static BTreeSet<usize>)> {
    fn walk(
        node: &'static LandmarkNode,
        prefix: String,
        out: &mut Vec<(String, &'static BTreeSet<usize>)>,
    ) {
        out.push((prefix.clone(), &node.indices));
        for (name, child) in node.children.iter() {
            walk(child, format!("{prefix}/{name}"), out);
        }
    }

    let mut out = Vec::new();
    walk(&LANDMARK_TREE, "face".to_string(), &mut out);
    out
}
