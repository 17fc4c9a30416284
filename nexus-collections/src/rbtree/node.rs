//! Node layout and the color/link algorithms.
//!
//! Everything here works on untyped [`Link`]s so the balancing code is
//! compiled once per tree layout rather than once per value type.
//!
//! The header node anchors the tree: `parent` is the root, `left` the
//! leftmost node and `right` the rightmost. It is colored red, which together
//! with `header.parent.parent == header` tells it apart from the (black)
//! root when stepping back from the end position.

use std::mem;
use std::ptr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Color {
    Red,
    Black,
}

#[repr(C)]
pub(crate) struct NodeBase {
    pub(crate) color: Color,
    pub(crate) parent: Link,
    pub(crate) left: Link,
    pub(crate) right: Link,
}

pub(crate) type Link = *mut NodeBase;

#[repr(C)]
pub(crate) struct Node<V> {
    pub(crate) base: NodeBase,
    pub(crate) value: V,
}

impl NodeBase {
    /// An empty header: no root, leftmost and rightmost point back at itself.
    pub(crate) unsafe fn init_header(header: Link) {
        unsafe {
            header.write(NodeBase {
                color: Color::Red,
                parent: ptr::null_mut(),
                left: header,
                right: header,
            });
        }
    }
}

/// Address of the value slot of `node`.
///
/// Computed with wrapping arithmetic so it is also defined for the header,
/// whose slot must never be read.
#[inline]
pub(crate) fn value_ptr<V>(node: Link) -> *mut V {
    node.cast::<u8>()
        .wrapping_add(mem::offset_of!(Node<V>, value))
        .cast::<V>()
}

#[inline]
pub(crate) unsafe fn is_red(x: Link) -> bool {
    !x.is_null() && unsafe { (*x).color } == Color::Red
}

#[inline]
pub(crate) unsafe fn minimum(mut x: Link) -> Link {
    unsafe {
        while !(*x).left.is_null() {
            x = (*x).left;
        }
    }
    x
}

#[inline]
pub(crate) unsafe fn maximum(mut x: Link) -> Link {
    unsafe {
        while !(*x).right.is_null() {
            x = (*x).right;
        }
    }
    x
}

/// In-order successor. The successor of the rightmost node is the header.
pub(crate) unsafe fn increment(mut x: Link) -> Link {
    unsafe {
        if !(*x).right.is_null() {
            return minimum((*x).right);
        }
        let mut y = (*x).parent;
        while x == (*y).right {
            x = y;
            y = (*y).parent;
        }
        // Only differs when x climbed to the header with the root as the
        // rightmost node.
        if (*x).right != y {
            x = y;
        }
        x
    }
}

/// In-order predecessor. The predecessor of the header is the rightmost node.
pub(crate) unsafe fn decrement(mut x: Link) -> Link {
    unsafe {
        if (*x).color == Color::Red && (*(*x).parent).parent == x {
            return (*x).right;
        }
        if !(*x).left.is_null() {
            return maximum((*x).left);
        }
        let mut y = (*x).parent;
        while x == (*y).left {
            x = y;
            y = (*y).parent;
        }
        y
    }
}

unsafe fn rotate_left(x: Link, root: *mut Link) {
    unsafe {
        let y = (*x).right;
        (*x).right = (*y).left;
        if !(*y).left.is_null() {
            (*(*y).left).parent = x;
        }
        (*y).parent = (*x).parent;
        if x == *root {
            *root = y;
        } else if x == (*(*x).parent).left {
            (*(*x).parent).left = y;
        } else {
            (*(*x).parent).right = y;
        }
        (*y).left = x;
        (*x).parent = y;
    }
}

unsafe fn rotate_right(x: Link, root: *mut Link) {
    unsafe {
        let y = (*x).left;
        (*x).left = (*y).right;
        if !(*y).right.is_null() {
            (*(*y).right).parent = x;
        }
        (*y).parent = (*x).parent;
        if x == *root {
            *root = y;
        } else if x == (*(*x).parent).right {
            (*(*x).parent).right = y;
        } else {
            (*(*x).parent).left = y;
        }
        (*y).right = x;
        (*x).parent = y;
    }
}

/// Link the fresh node `z` as a child of `p` and restore the color rules.
///
/// `insert_left` picks the side; it must be `true` when `p` is the header.
pub(crate) unsafe fn insert_and_rebalance(insert_left: bool, z: Link, p: Link, header: Link) {
    unsafe {
        (*z).parent = p;
        (*z).left = ptr::null_mut();
        (*z).right = ptr::null_mut();

        if insert_left {
            // For an empty tree this also sets leftmost.
            (*p).left = z;
            if p == header {
                (*header).parent = z;
                (*header).right = z;
            } else if p == (*header).left {
                (*header).left = z;
            }
        } else {
            (*p).right = z;
            if p == (*header).right {
                (*header).right = z;
            }
        }

        rebalance_after_insert(z, &raw mut (*header).parent);
    }
}

unsafe fn rebalance_after_insert(mut x: Link, root: *mut Link) {
    unsafe {
        (*x).color = Color::Red;
        while x != *root && (*(*x).parent).color == Color::Red {
            let xp = (*x).parent;
            let xpp = (*xp).parent;
            if xp == (*xpp).left {
                let uncle = (*xpp).right;
                if is_red(uncle) {
                    (*xp).color = Color::Black;
                    (*uncle).color = Color::Black;
                    (*xpp).color = Color::Red;
                    x = xpp;
                } else {
                    if x == (*xp).right {
                        x = xp;
                        rotate_left(x, root);
                    }
                    (*(*x).parent).color = Color::Black;
                    (*(*(*x).parent).parent).color = Color::Red;
                    rotate_right((*(*x).parent).parent, root);
                }
            } else {
                let uncle = (*xpp).left;
                if is_red(uncle) {
                    (*xp).color = Color::Black;
                    (*uncle).color = Color::Black;
                    (*xpp).color = Color::Red;
                    x = xpp;
                } else {
                    if x == (*xp).left {
                        x = xp;
                        rotate_right(x, root);
                    }
                    (*(*x).parent).color = Color::Black;
                    (*(*(*x).parent).parent).color = Color::Red;
                    rotate_left((*(*x).parent).parent, root);
                }
            }
        }
        (**root).color = Color::Black;
    }
}

/// Unlink `z` from the tree and restore the color rules.
///
/// A node with two children is replaced by its successor, which takes over
/// `z`'s position and color. Returns `z`, now detached.
pub(crate) unsafe fn rebalance_for_erase(z: Link, header: Link) -> Link {
    unsafe {
        let root = &raw mut (*header).parent;
        let leftmost = &raw mut (*header).left;
        let rightmost = &raw mut (*header).right;

        let mut y = z;
        let mut x: Link;
        let mut x_parent: Link;

        if (*y).left.is_null() {
            x = (*y).right;
        } else if (*y).right.is_null() {
            x = (*y).left;
        } else {
            y = minimum((*y).right);
            x = (*y).right;
        }

        if y != z {
            // Splice the successor y into z's place.
            (*(*z).left).parent = y;
            (*y).left = (*z).left;
            if y != (*z).right {
                x_parent = (*y).parent;
                if !x.is_null() {
                    (*x).parent = (*y).parent;
                }
                (*(*y).parent).left = x;
                (*y).right = (*z).right;
                (*(*z).right).parent = y;
            } else {
                x_parent = y;
            }
            if *root == z {
                *root = y;
            } else if (*(*z).parent).left == z {
                (*(*z).parent).left = y;
            } else {
                (*(*z).parent).right = y;
            }
            (*y).parent = (*z).parent;
            mem::swap(&mut (*y).color, &mut (*z).color);
            y = z;
        } else {
            x_parent = (*y).parent;
            if !x.is_null() {
                (*x).parent = (*y).parent;
            }
            if *root == z {
                *root = x;
            } else if (*(*z).parent).left == z {
                (*(*z).parent).left = x;
            } else {
                (*(*z).parent).right = x;
            }
            if *leftmost == z {
                *leftmost = if (*z).right.is_null() {
                    (*z).parent
                } else {
                    minimum(x)
                };
            }
            if *rightmost == z {
                *rightmost = if (*z).left.is_null() {
                    (*z).parent
                } else {
                    maximum(x)
                };
            }
        }

        if (*y).color != Color::Red {
            while x != *root && !is_red(x) {
                if x == (*x_parent).left {
                    let mut w = (*x_parent).right;
                    if is_red(w) {
                        (*w).color = Color::Black;
                        (*x_parent).color = Color::Red;
                        rotate_left(x_parent, root);
                        w = (*x_parent).right;
                    }
                    if !is_red((*w).left) && !is_red((*w).right) {
                        (*w).color = Color::Red;
                        x = x_parent;
                        x_parent = (*x_parent).parent;
                    } else {
                        if !is_red((*w).right) {
                            (*(*w).left).color = Color::Black;
                            (*w).color = Color::Red;
                            rotate_right(w, root);
                            w = (*x_parent).right;
                        }
                        (*w).color = (*x_parent).color;
                        (*x_parent).color = Color::Black;
                        if !(*w).right.is_null() {
                            (*(*w).right).color = Color::Black;
                        }
                        rotate_left(x_parent, root);
                        break;
                    }
                } else {
                    let mut w = (*x_parent).left;
                    if is_red(w) {
                        (*w).color = Color::Black;
                        (*x_parent).color = Color::Red;
                        rotate_right(x_parent, root);
                        w = (*x_parent).left;
                    }
                    if !is_red((*w).right) && !is_red((*w).left) {
                        (*w).color = Color::Red;
                        x = x_parent;
                        x_parent = (*x_parent).parent;
                    } else {
                        if !is_red((*w).left) {
                            (*(*w).right).color = Color::Black;
                            (*w).color = Color::Red;
                            rotate_left(w, root);
                            w = (*x_parent).left;
                        }
                        (*w).color = (*x_parent).color;
                        (*x_parent).color = Color::Black;
                        if !(*w).left.is_null() {
                            (*(*w).left).color = Color::Black;
                        }
                        rotate_right(x_parent, root);
                        break;
                    }
                }
            }
            if !x.is_null() {
                (*x).color = Color::Black;
            }
        }
        y
    }
}
