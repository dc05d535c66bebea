//! Narrow phase collision detection between primitives
//!
//! Every primitive is reduced to a [`ShapeView`]: either a round shape or a
//! convex polygon with its outward face normals. Collision uses the
//! separating axis theorem over the union of both shapes' candidate axes.
//! Axes are canonicalized and sorted before testing, so the same axes are
//! tried in the same order whichever shape comes first, and
//! `collide(b, a) == collide(a, b).invert()` holds exactly.

use std::cmp::Ordering;

use crate::foundation::math::{canonical_axis, normalize_or_zero, vec_cmp, Vec2};
use crate::physics::primitive::{
    CollisionResult, ContactResult, HitKind, Primitive, RaycastResult,
};
use crate::physics::shapes::{
    edge_normals, project, support, Aabb, Circle, ConvexHull, Ray, PROJECTION_EPSILON,
};

/// Axes closer than this are treated as the same axis
const AXIS_EPSILON: f32 = 1.0e-6;

/// Geometry of a primitive as seen by the narrow phase
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeView {
    /// Circle
    Round {
        /// Center
        center: Vec2,
        /// Radius
        radius: f32,
    },
    /// Convex polygon (possibly degenerate)
    Poly {
        /// Counter-clockwise vertices
        vertices: Vec<Vec2>,
        /// Outward unit face normals
        normals: Vec<Vec2>,
    },
}

impl ShapeView {
    /// Build a polygon view; segments and points get end-cap normals
    pub fn polygon(vertices: Vec<Vec2>) -> Self {
        let mut normals = edge_normals(&vertices);
        match vertices.len() {
            1 => normals = vec![Vec2::x(), Vec2::y(), -Vec2::x(), -Vec2::y()],
            2 => {
                let e = normalize_or_zero(&(vertices[1] - vertices[0]));
                if e != Vec2::zeros() {
                    normals.push(e);
                    normals.push(-e);
                }
            }
            _ => {}
        }
        Self::Poly { vertices, normals }
    }

    /// View of a primitive
    pub fn of(primitive: &Primitive) -> Self {
        match primitive {
            Primitive::Circle(c) => Self::Round {
                center: c.center,
                radius: c.radius,
            },
            other => Self::polygon(other.outline(0)),
        }
    }

    /// Reference point used to break ties between equal push-outs
    pub fn center(&self) -> Vec2 {
        match self {
            Self::Round { center, .. } => *center,
            Self::Poly { vertices, .. } => {
                if vertices.is_empty() {
                    Vec2::zeros()
                } else {
                    vertices.iter().sum::<Vec2>() / vertices.len() as f32
                }
            }
        }
    }

    /// Projection interval onto a unit axis
    pub fn project(&self, axis: &Vec2) -> (f32, f32) {
        match self {
            Self::Round { center, radius } => {
                let c = center.dot(axis);
                (c - radius, c + radius)
            }
            Self::Poly { vertices, .. } => project(vertices, axis),
        }
    }

    /// Point furthest along `direction` (face midpoints for flat faces)
    pub fn support(&self, direction: &Vec2) -> Vec2 {
        match self {
            Self::Round { center, radius } => center + normalize_or_zero(direction) * *radius,
            Self::Poly { vertices, .. } => support(vertices, direction),
        }
    }

    /// Check if a point lies inside or on the shape
    pub fn contains(&self, point: &Vec2) -> bool {
        match self {
            Self::Round { center, radius } => (point - center).norm_squared() <= radius * radius,
            Self::Poly { vertices, normals } => normals.iter().all(|n| {
                let (_, hi) = project(vertices, n);
                n.dot(point) <= hi + PROJECTION_EPSILON * (1.0 + hi.abs())
            }),
        }
    }

    fn axes(&self) -> &[Vec2] {
        match self {
            Self::Round { .. } => &[],
            Self::Poly { normals, .. } => normals,
        }
    }
}

/// Whether two primitives overlap (touching counts)
pub fn overlaps(a: &Primitive, b: &Primitive) -> bool {
    match (a, b) {
        (Primitive::Aabb(a), Primitive::Aabb(b)) => a.intersects(b),
        (Primitive::Circle(a), Primitive::Circle(b)) => {
            let r = a.radius + b.radius;
            (b.center - a.center).norm_squared() <= r * r
        }
        _ => collide(a, b).overlaps,
    }
}

/// Penetration depth and push-out direction of `a` against `b`
pub fn collide(a: &Primitive, b: &Primitive) -> CollisionResult {
    match (a, b) {
        (Primitive::Aabb(a), Primitive::Aabb(b)) => collide_aabbs(a, b),
        (Primitive::Circle(a), Primitive::Circle(b)) => collide_circles(a, b),
        _ => collide_views(&ShapeView::of(a), &ShapeView::of(b)),
    }
}

/// Collision result of `a` against `b` with the deepest point of each shape
pub fn contact(a: &Primitive, b: &Primitive) -> ContactResult {
    let (va, vb) = (ShapeView::of(a), ShapeView::of(b));
    let result = collide(a, b);
    with_contacts(&va, &vb, result)
}

/// Separating axis test between two views
pub fn collide_views(a: &ShapeView, b: &ShapeView) -> CollisionResult {
    let axes = candidate_axes(a, b);
    let (ca, cb) = (a.center(), b.center());

    let mut best: Option<CollisionResult> = None;
    for axis in &axes {
        let Some(result) = resolve_axis(a.project(axis), b.project(axis), axis, &ca, &cb) else {
            return CollisionResult::none();
        };
        if best.map_or(true, |current| result.depth < current.depth) {
            best = Some(result);
        }
    }
    best.unwrap_or_default()
}

/// Add contact points to a collision result
pub fn with_contacts(a: &ShapeView, b: &ShapeView, result: CollisionResult) -> ContactResult {
    if !result.overlaps {
        return ContactResult::none();
    }
    ContactResult {
        overlaps: true,
        depth: result.depth,
        impulse: result.impulse,
        contacts: [a.support(&-result.impulse), b.support(&result.impulse)],
    }
}

/// Union of both shapes' axes in canonical, sorted, duplicate-free form
fn candidate_axes(a: &ShapeView, b: &ShapeView) -> Vec<Vec2> {
    let mut axes: Vec<Vec2> = a.axes().iter().chain(b.axes()).map(canonical_axis).collect();

    match (a, b) {
        (ShapeView::Round { center: c1, .. }, ShapeView::Round { center: c2, .. }) => {
            axes.push(canonical_axis(&normalize_or_zero(&(c2 - c1))));
        }
        (ShapeView::Round { center, .. }, ShapeView::Poly { vertices, .. })
        | (ShapeView::Poly { vertices, .. }, ShapeView::Round { center, .. }) => {
            if let Some(nearest) = nearest_vertex(vertices, center) {
                axes.push(canonical_axis(&normalize_or_zero(&(nearest - center))));
            }
        }
        _ => {}
    }

    axes.retain(|axis| *axis != Vec2::zeros());
    axes.sort_by(vec_cmp);
    axes.dedup_by(|x, y| (*x - *y).norm() <= AXIS_EPSILON);
    if axes.is_empty() {
        axes.push(Vec2::x());
    }
    axes
}

fn nearest_vertex(vertices: &[Vec2], point: &Vec2) -> Option<Vec2> {
    vertices.iter().copied().min_by(|x, y| {
        (x - point)
            .norm_squared()
            .total_cmp(&(y - point).norm_squared())
            .then_with(|| vec_cmp(x, y))
    })
}

/// Overlap of two projection intervals on one axis
///
/// Returns `None` when the intervals are separated. Otherwise picks the
/// shorter of the two push-outs for `a`; equal push-outs are settled by
/// which center lies further along the axis, so swapping `a` and `b` always
/// flips the chosen direction.
fn resolve_axis(
    (a_min, a_max): (f32, f32),
    (b_min, b_max): (f32, f32),
    axis: &Vec2,
    a_center: &Vec2,
    b_center: &Vec2,
) -> Option<CollisionResult> {
    if a_max < b_min || b_max < a_min {
        return None;
    }
    let push_negative = a_max - b_min;
    let push_positive = b_max - a_min;

    let negative = match push_negative.total_cmp(&push_positive) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => match a_center.dot(axis).total_cmp(&b_center.dot(axis)) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => vec_cmp(a_center, b_center) != Ordering::Greater,
        },
    };

    Some(if negative {
        CollisionResult::new(push_negative, -axis)
    } else {
        CollisionResult::new(push_positive, *axis)
    })
}

fn collide_aabbs(a: &Aabb, b: &Aabb) -> CollisionResult {
    let (ca, cb) = (a.center(), b.center());
    // Same order as the sorted canonical axes: y before x.
    let y = resolve_axis((a.min.y, a.max.y), (b.min.y, b.max.y), &Vec2::y(), &ca, &cb);
    let x = resolve_axis((a.min.x, a.max.x), (b.min.x, b.max.x), &Vec2::x(), &ca, &cb);
    match (y, x) {
        (Some(y), Some(x)) => {
            if x.depth < y.depth {
                x
            } else {
                y
            }
        }
        _ => CollisionResult::none(),
    }
}

fn collide_circles(a: &Circle, b: &Circle) -> CollisionResult {
    let delta = b.center - a.center;
    let r = a.radius + b.radius;
    if delta.norm_squared() > r * r {
        return CollisionResult::none();
    }
    let mut axis = canonical_axis(&normalize_or_zero(&delta));
    if axis == Vec2::zeros() {
        axis = Vec2::x();
    }
    resolve_axis(
        a.extent_along(&axis),
        b.extent_along(&axis),
        &axis,
        &a.center,
        &b.center,
    )
    .unwrap_or_default()
}

/// Cast a ray against a primitive
pub fn raycast(primitive: &Primitive, ray: &Ray) -> RaycastResult {
    raycast_view(&ShapeView::of(primitive), ray)
}

/// Cast a ray against a view
pub fn raycast_view(view: &ShapeView, ray: &Ray) -> RaycastResult {
    match view {
        ShapeView::Round { center, radius } => raycast_round(center, *radius, ray),
        ShapeView::Poly { vertices, normals } => raycast_poly(vertices, normals, ray),
    }
}

fn raycast_round(center: &Vec2, radius: f32, ray: &Ray) -> RaycastResult {
    let m = ray.origin - center;
    let c = m.norm_squared() - radius * radius;
    if c <= 0.0 {
        let mut normal = normalize_or_zero(&m);
        if normal == Vec2::zeros() {
            normal = -ray.direction;
        }
        return RaycastResult {
            hit: HitKind::Inside,
            distance: 0.0,
            contact: ray.origin,
            normal,
        };
    }

    let b = m.dot(&ray.direction);
    let discriminant = b * b - c;
    if b > 0.0 || discriminant < 0.0 {
        return RaycastResult::miss();
    }
    let t = (-b - discriminant.sqrt()).max(0.0);
    if t > ray.length {
        return RaycastResult::miss();
    }
    let contact = ray.point_at(t);
    RaycastResult {
        hit: HitKind::Outside,
        distance: t,
        contact,
        normal: normalize_or_zero(&(contact - center)),
    }
}

/// Cyrus-Beck clipping of the ray against the polygon's half planes
fn raycast_poly(vertices: &[Vec2], normals: &[Vec2], ray: &Ray) -> RaycastResult {
    if vertices.is_empty() {
        return RaycastResult::miss();
    }

    let planes: Vec<(Vec2, f32)> = normals.iter().map(|n| (*n, project(vertices, n).1)).collect();
    let outside_by = |(n, d): &(Vec2, f32)| n.dot(&ray.origin) - d;

    let eps = PROJECTION_EPSILON * (1.0 + ray.origin.amax());
    if planes.iter().all(|p| outside_by(p) <= eps) {
        // Report the face the origin is closest to.
        let normal = planes
            .iter()
            .max_by(|x, y| outside_by(x).total_cmp(&outside_by(y)))
            .map_or(-ray.direction, |(n, _)| *n);
        return RaycastResult {
            hit: HitKind::Inside,
            distance: 0.0,
            contact: ray.origin,
            normal,
        };
    }

    let mut t_enter = 0.0_f32;
    let mut t_exit = ray.length;
    let mut enter_normal: Option<Vec2> = None;
    for (n, d) in &planes {
        let denom = n.dot(&ray.direction);
        let distance = d - n.dot(&ray.origin);
        if denom.abs() <= f32::EPSILON {
            if distance < 0.0 {
                return RaycastResult::miss();
            }
            continue;
        }
        let t = distance / denom;
        if denom < 0.0 {
            if enter_normal.is_none() || t > t_enter {
                t_enter = t_enter.max(t);
                enter_normal = Some(*n);
            }
        } else {
            t_exit = t_exit.min(t);
        }
        if t_enter > t_exit {
            return RaycastResult::miss();
        }
    }

    match enter_normal {
        Some(normal) if t_enter <= ray.length => RaycastResult {
            hit: HitKind::Outside,
            distance: t_enter,
            contact: ray.point_at(t_enter),
            normal,
        },
        _ => RaycastResult::miss(),
    }
}

/// Whether a circle of `radius` swept along `ray` touches the primitive
pub fn circle_cast_hits(primitive: &Primitive, ray: &Ray, radius: f32) -> bool {
    let view = ShapeView::of(primitive);
    match &view {
        ShapeView::Round { center, radius: r } => {
            point_segment_distance(center, &ray.origin, &ray.end()) <= r + radius
        }
        ShapeView::Poly { vertices, .. } => {
            if raycast_view(&view, ray).is_hit() {
                return true;
            }
            let (start, end) = (ray.origin, ray.end());
            let n = vertices.len();
            (0..n).any(|i| {
                let (p, q) = (vertices[i], vertices[(i + 1) % n]);
                segment_distance(&start, &end, &p, &q) <= radius
            })
        }
    }
}

/// Whether an axis-aligned rectangle swept along `ray` touches the primitive
pub fn rect_cast_hits(primitive: &Primitive, ray: &Ray, half_extents: &Vec2) -> bool {
    let start = Aabb::from_center_extents(ray.origin, *half_extents);
    let end = Aabb::from_center_extents(ray.end(), *half_extents);
    let corners: Vec<Vec2> = start.corners().iter().chain(end.corners().iter()).copied().collect();
    let swept = ShapeView::polygon(ConvexHull::new(&corners).points);
    collide_views(&swept, &ShapeView::of(primitive)).overlaps
}

fn point_segment_distance(point: &Vec2, a: &Vec2, b: &Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    let t = if len_sq > 0.0 {
        ((point - a).dot(&ab) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (a + ab * t - point).norm()
}

/// Distance between two non-crossing segments
fn segment_distance(a0: &Vec2, a1: &Vec2, b0: &Vec2, b1: &Vec2) -> f32 {
    point_segment_distance(a0, b0, b1)
        .min(point_segment_distance(a1, b0, b1))
        .min(point_segment_distance(b0, a0, a1))
        .min(point_segment_distance(b1, a0, a1))
}
