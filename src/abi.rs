//! Call descriptors for the Keeper contracts with a fixed interface.
//!
//! Conditions and templates differ per deployment and are driven by the ABI in their artifact
//! instead, see [`crate::wrappers::conditions`] and [`crate::wrappers::templates`].

use alloy::sol;

sol! {
    #[sol(abi)]
    #[derive(Debug, PartialEq, Eq)]
    interface DIDRegistry {
        event DIDAttributeRegistered(
            bytes32 indexed _did,
            address indexed _owner,
            bytes32 indexed _checksum,
            string _value,
            address _lastUpdatedBy,
            uint256 _blockNumberUpdated
        );
        event ProvenanceAttributeRegistered(
            bytes32 indexed provId,
            bytes32 indexed _did,
            address indexed _agentId,
            bytes32 _activityId,
            bytes32 _relatedDid,
            address _agentInvolvedId,
            uint8 _method,
            string _attributes,
            uint256 _blockNumberUpdated
        );
        event WasGeneratedBy(
            bytes32 indexed _did,
            address indexed _agentId,
            bytes32 indexed _activityId,
            bytes32 provId,
            string _attributes,
            uint256 _blockNumberUpdated
        );
        event Used(
            bytes32 indexed _did,
            address indexed _agentId,
            bytes32 indexed _activityId,
            bytes32 provId,
            string _attributes,
            uint256 _blockNumberUpdated
        );
        event WasDerivedFrom(
            bytes32 indexed _newEntityDid,
            bytes32 indexed _usedEntityDid,
            address indexed _agentId,
            bytes32 _activityId,
            bytes32 provId,
            string _attributes,
            uint256 _blockNumberUpdated
        );
        event WasAssociatedWith(
            bytes32 indexed _entityDid,
            address indexed _agentId,
            bytes32 indexed _activityId,
            bytes32 provId,
            string _attributes,
            uint256 _blockNumberUpdated
        );
        event ActedOnBehalf(
            bytes32 indexed _entityDid,
            address indexed _delegateAgentId,
            address indexed _responsibleAgentId,
            bytes32 _activityId,
            bytes32 provId,
            string _attributes,
            uint256 _blockNumberUpdated
        );

        function registerDID(
            bytes32 _didSeed,
            bytes32 _checksum,
            address[] _providers,
            string _url,
            bytes32 _activityId,
            string _attributes
        ) external;
        function registerMintableDID(
            bytes32 _didSeed,
            bytes32 _checksum,
            address[] _providers,
            string _url,
            uint256 _cap,
            uint8 _royalties,
            bytes32 _activityId,
            string _attributes
        ) external;
        function hashDID(bytes32 _didSeed, address _creator) external view returns (bytes32);
        function areRoyaltiesValid(bytes32 _did, uint256[] _amounts, address[] _receivers)
            external view returns (bool);
        function getBlockNumberUpdated(bytes32 _did) external view returns (uint256);
        function getDIDOwner(bytes32 _did) external view returns (address);
        function addDIDProvider(bytes32 _did, address _provider) external;
        function removeDIDProvider(bytes32 _did, address _provider) external;
        function isDIDProvider(bytes32 _did, address _provider) external view returns (bool);
        function transferDIDOwnership(bytes32 _did, address _newOwner) external;
        function grantPermission(bytes32 _did, address _grantee) external;
        function revokePermission(bytes32 _did, address _grantee) external;
        function getPermission(bytes32 _did, address _grantee) external view returns (bool);
        function getDIDRegister(bytes32 _did) external view returns (
            address owner,
            bytes32 lastChecksum,
            string url,
            address lastUpdatedBy,
            uint256 blockNumberUpdated,
            address[] providers,
            uint256 nftSupply,
            uint256 mintCap,
            uint256 royalties
        );

        function used(
            bytes32 _provId,
            bytes32 _did,
            address _agentId,
            bytes32 _activityId,
            bytes _signature,
            string _attributes
        ) external returns (bool);
        function wasDerivedFrom(
            bytes32 _provId,
            bytes32 _newEntityDid,
            bytes32 _usedEntityDid,
            address _agentId,
            bytes32 _activityId,
            string _attributes
        ) external returns (bool);
        function wasAssociatedWith(
            bytes32 _provId,
            bytes32 _did,
            address _agentId,
            bytes32 _activityId,
            string _attributes
        ) external returns (bool);
        function actedOnBehalf(
            bytes32 _provId,
            bytes32 _did,
            address _delegateAgentId,
            address _responsibleAgentId,
            bytes32 _activityId,
            bytes _signature,
            string _attributes
        ) external returns (bool);
        function addDIDProvenanceDelegate(bytes32 _did, address delegated) external;
        function removeDIDProvenanceDelegate(bytes32 _did, address delegated) external;
        function isProvenanceDelegate(bytes32 _did, address _delegate) external view returns (bool);
        function getProvenanceOwner(bytes32 _did) external view returns (address);
        function provenanceSignatureIsCorrect(address _agentId, bytes32 _hash, bytes _signature)
            external pure returns (bool);
        function getProvenanceEntry(bytes32 _provId) external view returns (
            bytes32 did,
            bytes32 relatedDid,
            address agentId,
            bytes32 activityId,
            address agentInvolvedId,
            uint8 method,
            address createdBy,
            uint256 blockNumberUpdated,
            bytes signature
        );

        function mint(bytes32 _did, uint256 _amount) external;
        function burn(bytes32 _did, uint256 _amount) external;
        function balanceOf(address account, uint256 id) external view returns (uint256);
        function safeTransferFrom(address from, address to, uint256 id, uint256 amount, bytes data)
            external;
        function isApprovedForAll(address account, address operator) external view returns (bool);
        function setProxyApproval(address operator, bool approved) external;
    }
}

sol! {
    #[sol(abi)]
    #[derive(Debug, PartialEq, Eq)]
    interface NeverminedToken {
        event Transfer(address indexed from, address indexed to, uint256 value);
        event Approval(address indexed owner, address indexed spender, uint256 value);

        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address recipient, uint256 amount) external returns (bool);
        function totalSupply() external view returns (uint256);
        function increaseAllowance(address spender, uint256 addedValue) external returns (bool);
        function decreaseAllowance(address spender, uint256 subtractedValue) external returns (bool);
    }
}

sol! {
    #[sol(abi)]
    #[derive(Debug, PartialEq, Eq)]
    interface Dispenser {
        event RequestFrequencyExceeded(address indexed requester, uint256 minPeriod);
        event RequestLimitExceeded(address indexed requester, uint256 amount, uint256 maxAmount);

        function requestTokens(uint256 amount) external returns (bool);
    }
}

sol! {
    #[sol(abi)]
    #[derive(Debug, PartialEq, Eq)]
    interface AgreementStoreManager {
        function createAgreement(
            bytes32 _id,
            bytes32 _did,
            address[] _conditionTypes,
            bytes32[] _conditionIds,
            uint256[] _timeLocks,
            uint256[] _timeOuts
        ) external;
        function getAgreementTemplate(bytes32 _id) external view returns (address);
        function getAgreementDIDOwner(bytes32 _id) external view returns (address);
        function getAgreementListSize() external view returns (uint256);
        function agreementId(bytes32 _idSeed, address _creator) external pure returns (bytes32);
    }
}

sol! {
    #[sol(abi)]
    #[derive(Debug, PartialEq, Eq)]
    interface ConditionStoreManager {
        function getCondition(bytes32 _id) external view returns (
            address typeRef,
            uint8 state,
            uint256 timeLock,
            uint256 timeOut,
            uint256 blockNumber
        );
        function getConditionState(bytes32 _id) external view returns (uint8);
        function getConditionListSize() external view returns (uint256);
    }
}

sol! {
    #[sol(abi)]
    #[derive(Debug, PartialEq, Eq)]
    interface AgreementTemplate {
        event AgreementCreated(
            bytes32 indexed _agreementId,
            bytes32 _did,
            address indexed _accessConsumer,
            address indexed _accessProvider,
            uint256[] _timeLocks,
            uint256[] _timeOuts,
            bytes32[] _conditionIdSeeds,
            bytes32[] _conditionIds,
            bytes32 _idSeed,
            address _creator
        );

        function createAgreement(
            bytes32 _id,
            bytes32 _did,
            bytes32[] _conditionIds,
            uint256[] _timeLocks,
            uint256[] _timeOuts,
            address _accessConsumer
        ) external;
        function getConditionTypes() external view returns (address[]);
        function getAgreementData(bytes32 _id) external view returns (
            address accessConsumer,
            address accessProvider
        );
    }
}

sol! {
    #[sol(abi)]
    #[derive(Debug, PartialEq, Eq)]
    interface Condition {
        function abortByTimeOut(bytes32 _id) external returns (uint8);
    }
}

sol! {
    #[sol(abi)]
    #[derive(Debug, PartialEq, Eq)]
    interface NFTUpgradeable {
        function isApprovedForAll(address account, address operator) external view returns (bool);
        function setProxyApproval(address operator, bool approved) external;
        function proxySetApprovalForAll(address account, address operator, bool approved) external;
        function setApprovalForAll(address operator, bool approved) external;
        function mint(address to, uint256 id, uint256 amount, bytes data) external;
        function burn(address to, uint256 id, uint256 amount) external;
        function addMinter(address account) external;
        function balanceOf(address account, uint256 id) external view returns (uint256);
        function safeTransferFrom(address from, address to, uint256 id, uint256 amount, bytes data)
            external;
    }
}

sol! {
    #[sol(abi)]
    #[derive(Debug, PartialEq, Eq)]
    interface NFT721Upgradeable {
        function isApprovedForAll(address owner, address operator) external view returns (bool);
        function getApproved(uint256 tokenId) external view returns (address);
        function approve(address to, uint256 tokenId) external;
        function setApprovalForAll(address operator, bool approved) external;
        function mint(address to, uint256 tokenId) external;
        function burn(uint256 tokenId) external;
        function addMinter(address account) external;
        function balanceOf(address owner) external view returns (uint256);
        function ownerOf(uint256 tokenId) external view returns (address);
        function safeTransferFrom(address from, address to, uint256 tokenId) external;
    }
}
