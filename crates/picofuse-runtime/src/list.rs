//! Intrusive singly-owned lists of values.
//!
//! A list is a `Tag::LIST` value whose body is a [`Container`]. Elements
//! are ordinary values chained through their [`Links`]; each element may
//! belong to one list at a time and the list holds one reference on it.

use picofuse_core::Tag;

use crate::app::Application;
use crate::error::{ListError, ValueError};
use crate::value::{Body, InitArgs, Links, ValueRef};

/// Bookkeeping stored in a list value's body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Container {
    pub(crate) count: usize,
    pub(crate) head: Option<ValueRef>,
    pub(crate) tail: Option<ValueRef>,
}

impl Container {
    /// Number of linked elements.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether no element is linked.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// First element.
    pub fn head(&self) -> Option<ValueRef> {
        self.head
    }

    /// Last element.
    pub fn tail(&self) -> Option<ValueRef> {
        self.tail
    }
}

/// Head-to-tail iterator over a list's elements.
pub struct ListIter<'a> {
    app: &'a Application,
    cursor: Option<ValueRef>,
}

impl Iterator for ListIter<'_> {
    type Item = ValueRef;

    fn next(&mut self) -> Option<ValueRef> {
        let current = self.cursor?;
        self.cursor = self.app.links(current).ok().and_then(|l| l.next);
        Some(current)
    }
}

impl Application {
    /// An empty list.
    #[track_caller]
    pub fn new_list(&mut self) -> Result<ValueRef, ValueError> {
        self.new_value(Tag::LIST, InitArgs::None)
    }

    fn container(&self, list: ValueRef) -> Result<&Container, ValueError> {
        match self.body(list)? {
            Body::List(c) => Ok(c),
            _ => Err(self.wrong_type(list, "list")),
        }
    }

    fn container_mut(&mut self, list: ValueRef) -> Result<&mut Container, ValueError> {
        self.container(list)?;
        match self.body_mut(list)? {
            Body::List(c) => Ok(c),
            _ => unreachable!("checked above"),
        }
    }

    /// Append `value` to `list` in O(1), retaining it for the list.
    pub fn push_back(&mut self, list: ValueRef, value: ValueRef) -> Result<(), ListError> {
        if list == value {
            return Err(ListError::SelfLink(list));
        }
        let mut ancestor = self.links(list)?.owner;
        while let Some(outer) = ancestor {
            if outer == value {
                return Err(ListError::Cycle {
                    element: value,
                    list,
                });
            }
            ancestor = self.links(outer)?.owner;
        }
        let tail = self.container(list)?.tail;
        if let Some(owner) = self.links(value)?.owner {
            return Err(ListError::AlreadyLinked {
                element: value,
                owner,
            });
        }
        self.pool.retain(value)?;

        *self.links_mut(value)? = Links {
            owner: Some(list),
            next: None,
            prev: tail,
        };
        match tail {
            Some(t) => self.links_mut(t)?.next = Some(value),
            None => self.container_mut(list)?.head = Some(value),
        }
        let c = self.container_mut(list)?;
        c.tail = Some(value);
        c.count += 1;
        Ok(())
    }

    /// Unlink and return the head of `list` in O(1).
    ///
    /// The list's reference moves to the caller, who must release it.
    pub fn pop_front(&mut self, list: ValueRef) -> Result<Option<ValueRef>, ListError> {
        let Some(head) = self.container(list)?.head else {
            return Ok(None);
        };
        let next = std::mem::take(self.links_mut(head)?).next;
        match next {
            Some(n) => self.links_mut(n)?.prev = None,
            None => self.container_mut(list)?.tail = None,
        }
        let c = self.container_mut(list)?;
        c.head = next;
        c.count -= 1;
        Ok(Some(head))
    }

    /// Number of elements in `list`.
    pub fn list_len(&self, list: ValueRef) -> Result<usize, ListError> {
        Ok(self.container(list)?.count)
    }

    /// Iterate the elements of `list`, head to tail.
    pub fn list_iter(&self, list: ValueRef) -> Result<ListIter<'_>, ListError> {
        let cursor = self.container(list)?.head;
        Ok(ListIter { app: self, cursor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── push / pop ─────────────────────────────────────────────

    #[test]
    fn new_list_is_empty() {
        let mut app = Application::new().unwrap();
        let list = app.new_list().unwrap();
        assert_eq!(app.list_len(list).unwrap(), 0);
        assert_eq!(app.list_iter(list).unwrap().count(), 0);
        assert_eq!(app.pop_front(list).unwrap(), None);
    }

    #[test]
    fn fifo_order() {
        let mut app = Application::new().unwrap();
        let list = app.new_list().unwrap();
        let vs: Vec<_> = (0..4).map(|i| app.new_u8(i).unwrap()).collect();
        for v in &vs {
            app.push_back(list, *v).unwrap();
        }
        assert_eq!(app.list_iter(list).unwrap().collect::<Vec<_>>(), vs);
        for v in &vs {
            assert_eq!(app.pop_front(list).unwrap(), Some(*v));
            app.release(*v);
        }
        assert_eq!(app.list_len(list).unwrap(), 0);
        assert_eq!(app.pop_front(list).unwrap(), None);
    }

    #[test]
    fn push_retains_and_pop_transfers() {
        let mut app = Application::new().unwrap();
        let list = app.new_list().unwrap();
        let v = app.new_u8(1).unwrap();
        app.push_back(list, v).unwrap();
        assert_eq!(app.ref_count(v).unwrap(), 1);
        assert_eq!(app.links(v).unwrap().owner, Some(list));

        let popped = app.pop_front(list).unwrap().unwrap();
        assert_eq!(app.ref_count(popped).unwrap(), 1);
        assert!(!app.links(popped).unwrap().is_linked());
        assert!(app.release(popped));
    }

    #[test]
    fn list_can_be_refilled_after_emptying() {
        let mut app = Application::new().unwrap();
        let list = app.new_list().unwrap();
        let a = app.new_u8(1).unwrap();
        let b = app.new_u8(2).unwrap();
        app.push_back(list, a).unwrap();
        let _ = app.pop_front(list).unwrap();
        app.push_back(list, b).unwrap();
        app.push_back(list, a).unwrap();
        assert_eq!(app.list_iter(list).unwrap().collect::<Vec<_>>(), vec![b, a]);
    }

    // ── rejected links ─────────────────────────────────────────

    #[test]
    fn enclosing_list_cannot_be_pushed_into_its_element() {
        let mut app = Application::new().unwrap();
        let outer = app.new_list().unwrap();
        let middle = app.new_list().unwrap();
        let inner = app.new_list().unwrap();
        app.push_back(outer, middle).unwrap();
        app.push_back(middle, inner).unwrap();

        assert_eq!(
            app.push_back(middle, outer),
            Err(ListError::Cycle {
                element: outer,
                list: middle
            })
        );
        assert_eq!(
            app.push_back(inner, outer),
            Err(ListError::Cycle {
                element: outer,
                list: inner
            })
        );
        assert_eq!(app.ref_count(outer).unwrap(), 0);
        assert_eq!(app.list_len(inner).unwrap(), 0);
        assert_eq!(app.render(outer, false).unwrap(), "[[[]]]");
    }

    #[test]
    fn already_linked_rejected() {
        let mut app = Application::new().unwrap();
        let l1 = app.new_list().unwrap();
        let l2 = app.new_list().unwrap();
        let v = app.new_u8(1).unwrap();
        app.push_back(l1, v).unwrap();
        assert_eq!(
            app.push_back(l2, v),
            Err(ListError::AlreadyLinked {
                element: v,
                owner: l1
            })
        );
        assert_eq!(app.ref_count(v).unwrap(), 1);
        assert_eq!(app.list_len(l2).unwrap(), 0);
    }

    #[test]
    fn self_link_rejected() {
        let mut app = Application::new().unwrap();
        let list = app.new_list().unwrap();
        assert_eq!(app.push_back(list, list), Err(ListError::SelfLink(list)));
    }

    #[test]
    fn non_list_rejected() {
        let mut app = Application::new().unwrap();
        let not_list = app.new_u8(1).unwrap();
        let v = app.new_u8(2).unwrap();
        assert!(matches!(
            app.push_back(not_list, v),
            Err(ListError::Value(ValueError::WrongType {
                expected: "list",
                ..
            }))
        ));
        assert!(app.list_len(not_list).is_err());
    }

    #[test]
    fn nested_lists_are_values() {
        let mut app = Application::new().unwrap();
        let outer = app.new_list().unwrap();
        let inner = app.new_list().unwrap();
        let v = app.new_u8(9).unwrap();
        app.push_back(inner, v).unwrap();
        app.push_back(outer, inner).unwrap();
        assert_eq!(app.render(outer, false).unwrap(), "[[9]]");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn count_matches_reachable(ops in prop::collection::vec(any::<bool>(), 0..64)) {
                let mut app = Application::new().unwrap();
                let list = app.new_list().unwrap();
                let mut model = std::collections::VecDeque::new();
                for push in ops {
                    if push {
                        let v = app.new_u8(0).unwrap();
                        app.push_back(list, v).unwrap();
                        model.push_back(v);
                    } else {
                        let popped = app.pop_front(list).unwrap();
                        prop_assert_eq!(popped, model.pop_front());
                        if let Some(v) = popped {
                            app.release(v);
                        }
                    }
                    let walked: Vec<_> = app.list_iter(list).unwrap().collect();
                    prop_assert_eq!(walked.len(), app.list_len(list).unwrap());
                    prop_assert_eq!(walked, model.iter().copied().collect::<Vec<_>>());
                }
            }
        }
    }
}
