//! The module gathers structures used to identify sequences from their rank.
//! The rank of a sequence in its input file is its id, used in index, staged file names and outputs.

/// A sequence as read from a fasta file.
#[derive(Clone, Debug)]
pub struct IdSeq {
    /// rank of sequence in file
    pub(crate) rank: usize,
    /// id of sequence as read in head of fasta record.
    name: String,
    /// residues, uppercase
    seq: Vec<u8>,
} // end of IdSeq

impl IdSeq {
    ///
    pub fn new(rank: usize, name: String, seq: Vec<u8>) -> Self {
        IdSeq { rank, name, seq }
    }

    pub fn get_rank(&self) -> usize {
        self.rank
    }

    /// get fasta id
    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_sequence(&self) -> &[u8] {
        &self.seq
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// fasta record, one header line and one residue line
    pub fn to_fasta(&self) -> Vec<u8> {
        let mut txt = Vec::<u8>::with_capacity(self.name.len() + self.seq.len() + 3);
        txt.push(b'>');
        txt.extend_from_slice(self.name.as_bytes());
        txt.push(b'\n');
        txt.extend_from_slice(&self.seq);
        txt.push(b'\n');
        txt
    }
} // end of impl IdSeq

//======================================================================================

/// to keep track of sequences by their rank.
pub struct SeqDict(pub Vec<IdSeq>);

impl SeqDict {
    pub fn new(size: usize) -> Self {
        SeqDict(Vec::with_capacity(size))
    }

    /// appends a sequence, setting its rank to its position
    pub fn push(&mut self, name: String, seq: Vec<u8>) -> usize {
        let rank = self.0.len();
        self.0.push(IdSeq::new(rank, name, seq));
        rank
    }

    /// appends a sequence already built, its rank is reset to its position
    pub fn push_idseq(&mut self, mut seq: IdSeq) -> usize {
        let rank = self.0.len();
        seq.rank = rank;
        self.0.push(seq);
        rank
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, rank: usize) -> Option<&IdSeq> {
        self.0.get(rank)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IdSeq> {
        self.0.iter()
    }

    /// sequence lengths by rank
    pub fn get_lengths(&self) -> Vec<usize> {
        self.0.iter().map(|s| s.len()).collect()
    }

    /// names by rank
    pub fn get_names(&self) -> Vec<String> {
        self.0.iter().map(|s| s.get_name().to_string()).collect()
    }

    pub fn get_total_length(&self) -> usize {
        self.0.iter().map(|s| s.len()).sum()
    }
} // end of impl SeqDict
